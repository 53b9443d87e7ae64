use std::error::Error;
use std::io;
use std::process;

use csv_stream::{Reader, Writer};

fn example() -> Result<(), Box<dyn Error>> {
    let mut rdr = Reader::from_reader(io::stdin());
    let mut wtr = Writer::from_writer(io::stdout());
    let mut fields = 0;
    while let Some(row) = rdr.next_row()? {
        fields += row.len();
        wtr.write_csv_row(&row)?;
    }
    wtr.close()?;
    eprintln!("{} rows, {} fields", rdr.rows_read(), fields);
    Ok(())
}

fn main() {
    if let Err(err) = example() {
        println!("error running example: {}", err);
        process::exit(1);
    }
}
