//! Extracts the register map of a worksheet dump and prints it as JSON
//!
//! ```text
//! cargo run --example dump_map -- sheet.json [map.json]
//! ```
//!
//! The input is a JSON worksheet dump (`{"cells": [[...]], "merged": [...]}`).
//! With a second argument the map is saved there instead of printed.

use std::{env, process};

use regsheet::{RegisterMap, Sheet};

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: dump_map <sheet.json> [map.json]");
        process::exit(2);
    };

    if let Err(error) = run(&input, args.next()) {
        eprintln!("dump_map: {}", error);
        process::exit(1);
    }
}

fn run(input: &str, output: Option<String>) -> Result<(), regsheet::Error> {
    let sheet = Sheet::load(input)?;
    let map = RegisterMap::build(&sheet);

    for register in &map {
        log::info!(
            "{} {}: {} fields, default 0x{:08X}",
            register.address,
            register.description,
            register.fields.len(),
            register.default_value
        );
    }

    match output {
        Some(path) => map.save(path)?,
        None => println!("{}", map.to_json_pretty()?),
    }

    Ok(())
}
