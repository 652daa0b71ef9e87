use std::fmt::Write as _;
use std::path::Path;
use std::{env, fs};

use serde::Deserialize;

const FAMILIES: [&str; 5] = ["16h5", "25h7", "25h9", "36h9", "36h11"];

#[derive(Deserialize)]
struct CodebookFile {
    family: String,
    codes: Vec<String>,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let mut src = String::new();
    for family in FAMILIES {
        let name = format!("TAG{}_CODES", family.to_uppercase());
        let path = format!("data/{name}.json");
        println!("cargo:rerun-if-changed={path}");

        let json = fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
        let file: CodebookFile =
            serde_json::from_str(&json).unwrap_or_else(|e| panic!("{path}: {e}"));
        assert_eq!(file.family, family, "{path}: wrong family");
        assert!(!file.codes.is_empty(), "{path}: no codes");

        let bits: u32 = family[..2].parse().expect("family names start with the bit count");

        writeln!(src, "pub const {name}: &[u64] = &[").unwrap();
        for code in &file.codes {
            let hex = code.trim_start_matches("0x");
            let value = u64::from_str_radix(hex, 16)
                .unwrap_or_else(|e| panic!("{path}: bad code {code}: {e}"));
            assert!(value >> bits == 0, "{path}: {code} wider than {bits} bits");
            writeln!(src, "    {value:#x},").unwrap();
        }
        writeln!(src, "];").unwrap();
    }

    let out = Path::new(&env::var("OUT_DIR").expect("OUT_DIR is set by cargo")).join("builtins.rs");
    fs::write(&out, src).unwrap_or_else(|e| panic!("{}: {e}", out.display()));
}
