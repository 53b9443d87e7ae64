use std::error::Error;
use std::io;
use std::process;

fn example() -> Result<(), Box<dyn Error>> {
    let mut rdr = csv_stream::Reader::from_reader(io::stdin());
    while let Some(row) = rdr.next_string_row()? {
        for (i, field) in row.iter().enumerate() {
            println!("{}.Field: {}", i + 1, field);
        }
        println!();
    }
    println!("Rows read: {}", rdr.rows_read());
    Ok(())
}

fn main() {
    if let Err(err) = example() {
        println!("error running example: {}", err);
        process::exit(1);
    }
}
