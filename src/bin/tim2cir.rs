// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use compact_str::CompactString;
use itertools::Itertools;
use tim2spice::bits::Radix;
use tim2spice::config::{MappingFile, SynthConfig};
use tim2spice::deck::{fmt_g, Deck, DeckOptions};
use tim2spice::error::{Result, Tim2SpiceError};
use tim2spice::filter::ReferenceFilter;
use tim2spice::pwl::Level;
use tim2spice::synth::PwlSynthesizer;
use tim2spice::tim::TimParser;

#[derive(clap::Parser, Debug)]
struct ConverterArgs {
    /// GTKWave timing dump (.tim) to convert.
    input: PathBuf,
    /// Output SPICE deck path.
    ///
    /// If not specified, the input path with a `.cir` extension.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Supply voltage for logical 1, in volts.
    ///
    /// Overrides the mapping file. Defaults to 3.3.
    #[clap(long)]
    vdd: Option<f64>,
    /// Netlist under test to `.include` at the end of the deck.
    ///
    /// If not specified, `./<input stem>.spice`.
    #[clap(long)]
    include: Option<String>,
    /// Reference netlist or stimulus file.
    ///
    /// When given, only sources whose node or source name appears as
    /// a voltage source in this file are emitted.
    #[clap(long)]
    reference: Option<PathBuf>,
    /// Signal or bus names that bypass the reference filter.
    #[clap(long, value_delimiter = ',')]
    force_bus: Vec<String>,
    /// TOML file with node aliases, bus mappings and defaults.
    #[clap(long)]
    mapping: Option<PathBuf>,
    /// Radix of bare bus value literals (hex, dec or bin).
    #[clap(long)]
    radix: Option<Radix>,
    /// Drive unknown (X) and high-impedance (Z) states as logical 1
    /// instead of 0.
    #[clap(long)]
    unknown_high: bool,
    /// Device library included with `.lib`.
    #[clap(long)]
    lib: Option<String>,
    /// Process corner of the device library.
    #[clap(long)]
    corner: Option<String>,
}

/// Assemble the conversion settings: defaults, then the mapping file,
/// then command line flags.
fn build_config(args: &ConverterArgs) -> Result<SynthConfig> {
    let mut config = SynthConfig::default();
    if let Some(path) = &args.mapping {
        config.apply_mapping_file(MappingFile::load(path)?);
        clilog::info!("loaded mapping file {}", path.display());
    }
    if let Some(vdd) = args.vdd {
        config.vdd = vdd;
    }
    if let Some(radix) = args.radix {
        config.radix = radix;
    }
    if args.unknown_high {
        config.unknown_level = Level::High;
    }
    config.force_include.extend(
        args.force_bus.iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(CompactString::from));
    config.validate()?;
    Ok(config)
}

fn run(args: &ConverterArgs) -> Result<()> {
    if !args.input.is_file() {
        return Err(Tim2SpiceError::MissingInput(args.input.clone()))
    }
    let config = build_config(args)?;
    let reference = match &args.reference {
        Some(path) => {
            let mut filter = ReferenceFilter::load(path)?;
            for name in &config.force_include {
                filter.force_include(name);
            }
            Some(filter)
        }
        None => None
    };
    let text = std::fs::read_to_string(&args.input).map_err(|source| {
        Tim2SpiceError::Read { path: args.input.clone(), source }
    })?;

    let doc = TimParser::new().parse(&text);
    let mut stim = PwlSynthesizer::new(&config).synthesize(&doc);
    if let Some(filter) = &reference {
        filter.apply(&mut stim);
    }
    if stim.sources.is_empty() {
        clilog::warn!(SYN_NO_SOURCES,
                      "no stimulus sources produced from {}. \
                       the deck contains only power rails!",
                      args.input.display());
    }

    let output = args.output.clone()
        .unwrap_or_else(|| args.input.with_extension("cir"));
    let mut options = DeckOptions::for_paths(&args.input, &output);
    if let Some(include) = &args.include {
        options.include = include.as_str().into();
    }
    if let Some(lib) = &args.lib {
        options.lib_path = lib.as_str().into();
    }
    if let Some(corner) = &args.corner {
        options.corner = corner.as_str().into();
    }
    Deck::new(&stim, &options).write_to(&output)?;

    for src in stim.sources.values() {
        clilog::debug!("{} ({}): {} points", src.source_name, src.node, src.trace.len());
    }
    clilog::debug!("nodes: {}", stim.sources.keys().format(", "));
    println!("Wrote {}", output.display());
    println!("  time scale {} s, transition epsilon {} s",
             fmt_g(stim.time_scale, 6), fmt_g(stim.epsilon, 6));
    println!("  .tran step {} s, stop {} s",
             fmt_g(stim.timestep(), 6), fmt_g(stim.sim_time(), 6));
    println!("  {} sources", stim.sources.len());
    Ok(())
}

fn main() {
    clilog::init_stderr_color_debug();
    clilog::set_max_print_count(clilog::Level::Warn, "TIM_EDGE_BAD", 10);
    let args = <ConverterArgs as clap::Parser>::parse();
    clilog::info!("Converter args:\n{:#?}", args);

    if let Err(e) = run(&args) {
        clilog::error!("{}", e);
        std::process::exit(1);
    }
}
