use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: recipe-extract-office <file.docx>");
        eprintln!();
        eprintln!("Prints the text the importer would send for a local DOCX document.");
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

    match recipe_extract_office::extract_docx_from_bytes(&bytes) {
        Ok(text) => {
            println!("{}", text);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error extracting document from {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}
