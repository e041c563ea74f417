use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub fn load_data_from_csv<T: DeserializeOwned, const DELIMITER: u8>(
    file_path: &Path,
) -> Result<Vec<T>, csv::Error> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(DELIMITER)
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    load_data_from_reader(reader)
}

pub fn load_data_from_reader<T: DeserializeOwned, R: Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<T>, csv::Error> {
    reader.deserialize().collect()
}

pub fn dump_data_to_csv<T: Serialize>(data: &[T], file_path: &Path) -> Result<(), csv::Error> {
    let writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(file_path)?;
    dump_data_to_writer(data, writer)
}

pub fn dump_data_to_writer<T: Serialize, W: Write>(
    data: &[T],
    mut writer: csv::Writer<W>,
) -> Result<(), csv::Error> {
    for entry in data {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}
