use crate::StoreError;
use rank_core::MinuteStamp;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const SERVER_HEADER: [&str; 2] = ["time", "numplayers"];
pub const FLEET_HEADER: [&str; 3] = ["time", "numplayers", "online_servers"];

/// Append one row to a CSV log, writing `header` first when the file is new or empty.
/// A log whose last line has no terminator gets one before the new row.
pub fn append_row(path: &Path, header: &[&str], row: &[String]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };
    let csv_err = |source| StoreError::Csv { path: path.to_path_buf(), source };
    let mut file = OpenOptions::new().create(true).read(true).append(true).open(path).map_err(io_err)?;
    let fresh = file.metadata().map_err(io_err)?.len() == 0;
    if !fresh && !ends_with_newline(&mut file).map_err(io_err)? {
        file.write_all(b"\n").map_err(io_err)?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if fresh {
        wtr.write_record(header).map_err(csv_err)?;
    }
    wtr.write_record(row).map_err(csv_err)?;
    wtr.flush().map_err(io_err)
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

pub fn append_server_sample(path: &Path, time: MinuteStamp, numplayers: u32) -> Result<(), StoreError> {
    append_row(path, &SERVER_HEADER, &[time.to_string(), numplayers.to_string()])
}

pub fn append_fleet_sample(path: &Path, time: MinuteStamp, numplayers: u64, online_servers: usize) -> Result<(), StoreError> {
    append_row(path, &FLEET_HEADER, &[time.to_string(), numplayers.to_string(), online_servers.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.csv");
        append_server_sample(&path, 100, 4).unwrap();
        append_server_sample(&path, 101, 6).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "time,numplayers\n100,4\n101,6\n");
    }

    #[test]
    fn fleet_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("total.csv");
        append_fleet_sample(&path, 7, 120, 3).unwrap();
        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.headers().unwrap().iter().collect::<Vec<_>>(), vec!["time", "numplayers", "online_servers"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "120");
    }

    #[test]
    fn unterminated_last_line_is_closed_before_appending() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.csv");
        std::fs::write(&path, "time,numplayers\n100,4").unwrap();
        append_server_sample(&path, 101, 6).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "time,numplayers\n100,4\n101,6\n");

        let total = tmp.path().join("total.csv");
        std::fs::write(&total, "time,numplayers,online_servers").unwrap();
        append_fleet_sample(&total, 7, 120, 3).unwrap();
        assert_eq!(std::fs::read_to_string(&total).unwrap(), "time,numplayers,online_servers\n7,120,3\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope/s.csv");
        let err = append_server_sample(&path, 1, 1).unwrap_err();
        assert_eq!(err.path(), path.as_path());
    }
}
