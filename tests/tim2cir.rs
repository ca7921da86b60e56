// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempdir::TempDir;

const DESIGN_TIM: &str = "\
Time_Scale: 1.000000E-9
Digital_Signal
  Name: clk
  Start_State: 0
  Edge: 10 1
  Edge: 20 0
Digital_Bus
  Name: A[3:0]
  Start_State: 5
  Edge: 30 A
";

fn tim2cir(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tim2cir"))
        .args(args)
        .output()
        .expect("cannot launch tim2cir")
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new("tim2cir").unwrap();
    let input = dir.path().join("design.tim");
    fs::write(p(&input), DESIGN_TIM).unwrap();
    (dir, input)
}

#[test]
fn converts_with_default_output() {
    let (dir, input) = setup();
    let out = tim2cir(&[p(&input)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let deck = fs::read_to_string(dir.path().join("design.cir")).unwrap();

    assert!(deck.starts_with("* Generated from design.tim\n* VDD Level: 3.3 V\n"));
    assert!(deck.contains(".tran 1e-08 3.3e-08\n"));
    assert!(deck.contains(".print tran format=raw file=design.raw v(*)\n"));
    assert!(deck.contains("* clk\nV_clk clk 0 PWL(0 0 9.999e-09 0 1e-08 3.3 1.9999e-08 3.3 2e-08 0)\n"));
    assert!(deck.contains("* A[0]\nV_A_0 A[0] 0 PWL(0 3.3 2.9999e-08 3.3 3e-08 0)\n"));
    assert!(deck.contains("V_A_3 A[3] 0 PWL(0 0 2.9999e-08 0 3e-08 3.3)\n"));
    assert!(deck.ends_with(".include \"./design.spice\"\n.end\n"));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("5 sources"), "{}", stdout);
}

#[test]
fn missing_input_writes_nothing() {
    let (dir, _) = setup();
    let input = dir.path().join("absent.tim");
    let output = dir.path().join("absent.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output)]);
    assert!(!out.status.success());
    assert!(!output.exists());
}

#[test]
fn reference_restricts_sources() {
    let (dir, input) = setup();
    let reference = dir.path().join("reference.cir");
    fs::write(p(&reference), "* old stimulus\nV_clk clk 0 DC 0\nVa0 A[0] 0 DC 0\n").unwrap();
    let output = dir.path().join("filtered.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--reference", p(&reference)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("V_clk clk"));
    assert!(deck.contains("V_A_0 A[0]"));
    assert!(!deck.contains("V_A_1"));
    assert!(deck.contains("file=filtered.raw"));

    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--reference", p(&reference),
                        "--force-bus", "A"]);
    assert!(out.status.success());
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("V_A_3 A[3]"));
}

#[test]
fn mapping_file_and_flags() {
    let (dir, input) = setup();
    let mapping = dir.path().join("map.toml");
    fs::write(p(&mapping), "\
vdd = 1.8

[signals]
clk = \"ui_clk\"

[buses.\"A[3:0]\"]
target = \"ui_in\"
msb = 3
lsb = 0
base_index = 4
").unwrap();
    let output = dir.path().join("mapped.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--mapping", p(&mapping),
                        "--include", "../netlist/top.spice"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("Vvdd VPWR 0 DC 1.8\n"));
    assert!(deck.contains("V_ui_clk ui_clk 0 PWL(0 0 "));
    assert!(deck.contains("V_ui_in_4 ui_in[4] 0 PWL(0 1.8 "));
    assert!(deck.contains("V_ui_in_7 ui_in[7] 0 PWL(0 0 "));
    assert!(deck.contains(".include \"../netlist/top.spice\"\n"));

    // command line wins over the mapping file.
    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--mapping", p(&mapping),
                        "--vdd", "5"]);
    assert!(out.status.success());
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("Vvdd VPWR 0 DC 5\n"));
}

#[test]
fn bad_mapping_file_is_fatal() {
    let (dir, input) = setup();
    let mapping = dir.path().join("bad.toml");
    fs::write(p(&mapping), "vdd = \"three\"\n").unwrap();
    let output = dir.path().join("bad.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--mapping", p(&mapping)]);
    assert!(!out.status.success());
    assert!(!output.exists());
}

#[test]
fn zero_sources_still_writes_deck() {
    let (dir, input) = setup();
    let reference = dir.path().join("unrelated.cir");
    fs::write(p(&reference), "* nothing in common\nVbias bias 0 DC 0.9\n").unwrap();
    let output = dir.path().join("empty.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output),
                        "--reference", p(&reference)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("Vvdd VPWR 0 DC 3.3\n"));
    assert!(deck.contains("Vgnd VGND 0 DC 0\n"));
    assert!(!deck.contains("PWL("));
    assert!(deck.ends_with(".end\n"));
    assert!(String::from_utf8_lossy(&out.stdout).contains("0 sources"));

    let blank = dir.path().join("blank.tim");
    fs::write(p(&blank), "").unwrap();
    let output = dir.path().join("blank.cir");
    let out = tim2cir(&[p(&blank), "-o", p(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let deck = fs::read_to_string(&output).unwrap();
    assert!(deck.contains("Vgnd VGND 0 DC 0\n"));
    assert!(deck.contains(".tran 1e-11 1e-09\n"));
    assert!(!deck.contains("PWL("));
}

#[test]
fn unwritable_output_is_fatal() {
    let (dir, input) = setup();
    let output = dir.path().join("no_such_dir").join("out.cir");
    let out = tim2cir(&[p(&input), "-o", p(&output)]);
    assert!(!out.status.success());
    assert!(!output.exists());
}
