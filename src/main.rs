use mork_reader::MorkReader;
use std::env;
use std::io;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-mab-file> [--scope <HEX>] [--encoding <LABEL>] [--dump]",
            args[0]
        );
        std::process::exit(1);
    }

    let mork_path = &args[1];
    let mut default_scope: Option<u32> = None;
    let mut encoding: Option<String> = None;
    let mut full_dump = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--scope" => {
                let hex = args.get(i + 1).unwrap_or_else(|| {
                    eprintln!("ERROR: --scope flag requires a hex argument.");
                    std::process::exit(1);
                });
                match u32::from_str_radix(hex, 16) {
                    Ok(scope) => default_scope = Some(scope),
                    Err(_) => {
                        eprintln!("ERROR: Invalid hex scope: {}", hex);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--encoding" => {
                let label = args.get(i + 1).unwrap_or_else(|| {
                    eprintln!("ERROR: --encoding flag requires an argument.");
                    std::process::exit(1);
                });
                encoding = Some(label.clone());
                i += 2;
            }
            "--dump" => {
                full_dump = true;
                i += 1;
            }
            other => {
                eprintln!("ERROR: Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    println!("Reading Mork file: {}", mork_path);
    println!("{}", "=".repeat(60));

    match MorkReader::open(mork_path, default_scope, encoding.as_deref()) {
        Ok(reader) => {
            println!("\n{}", "=".repeat(60));
            println!("SUCCESS! Decoding completed.");
            println!("{}", "=".repeat(60));

            println!("\nStatistics:");
            println!("  Default scope: {:X}", reader.default_scope());
            println!("  Column dictionary entries: {}", reader.num_columns());
            println!("  Value dictionary entries: {}", reader.num_values());
            println!("  Tables: {}", reader.num_tables());
            println!("  Rows: {}", reader.num_rows());

            println!("\nSample Rows (first 10):");
            for (i, row) in reader.iter_rows().take(10).enumerate() {
                println!(
                    "  {}. table {:X}:{:X} row {:X}:{:X} ({} cells)",
                    i + 1,
                    row.table_id,
                    row.table_scope,
                    row.row_id,
                    row.row_scope,
                    row.cells.len()
                );
            }

            if full_dump {
                println!();
                if let Err(e) = reader.dump_to(&mut io::stdout()) {
                    eprintln!("ERROR: Failed to write dump: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("\nERROR: Failed to read Mork file");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
