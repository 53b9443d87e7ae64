use std::env;
use std::error::Error;
use std::ffi::OsString;
use std::process;

use csv_stream::ReaderBuilder;

fn example() -> Result<(), Box<dyn Error>> {
    let file_path = get_first_arg()?;
    let mut rdr = ReaderBuilder::new()
        .skip_initial_space(true)
        .from_path(&file_path)?;

    let mut fields = 0;
    for result in rdr.rows() {
        fields += result?.len();
    }
    println!(
        "{}: {} rows, {} fields",
        file_path.to_string_lossy(),
        rdr.rows_read(),
        fields
    );
    Ok(())
}

/// Returns the first positional argument sent to this process. If there are
/// no positional arguments, then this returns an error.
fn get_first_arg() -> Result<OsString, Box<dyn Error>> {
    match env::args_os().nth(1) {
        None => Err(From::from("expected 1 argument, but got none")),
        Some(file_path) => Ok(file_path),
    }
}

fn main() {
    if let Err(err) = example() {
        println!("error running example: {}", err);
        process::exit(1);
    }
}
