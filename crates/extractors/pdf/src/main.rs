use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: recipe-extract-pdf <file-path>");
        eprintln!();
        eprintln!("Prints the text the importer would send for a local PDF.");
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    match recipe_extract_pdf::extract_from_bytes(&bytes, &path.display().to_string()) {
        Ok(text) => {
            print!("{}", text);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error extracting PDF from {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}
