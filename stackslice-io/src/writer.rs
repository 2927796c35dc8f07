//! File writers for slice grids.

use crate::Result;
use stackslice_core::SliceGrid;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format, chosen from the file extension by [`GridFormat::from_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    Csv,
    Binary,
}

impl GridFormat {
    /// `.csv` selects CSV; anything else is binary.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => GridFormat::Csv,
            _ => GridFormat::Binary,
        }
    }
}

/// Writer for slice grid output.
pub struct GridWriter<W: Write = BufWriter<File>> {
    writer: W,
}

impl GridWriter {
    /// Creates a new file writer.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> GridWriter<W> {
    /// Wraps an arbitrary writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes in the given format.
    pub fn write(&mut self, grid: &SliceGrid, format: GridFormat) -> Result<()> {
        match format {
            GridFormat::Csv => self.write_csv(grid),
            GridFormat::Binary => self.write_binary(grid),
        }
    }

    /// Writes the grid as CSV.
    ///
    /// Header: `frame,valid,<position_0>,...`. Missing frames have
    /// `valid=false` and empty value cells.
    pub fn write_csv(&mut self, grid: &SliceGrid) -> Result<()> {
        write!(self.writer, "frame,valid")?;
        for position in grid.positions() {
            write!(self.writer, ",{position}")?;
        }
        writeln!(self.writer)?;

        for frame in 0..grid.frames() {
            match grid.row(frame) {
                Some(row) => {
                    write!(self.writer, "{frame},true")?;
                    for value in row {
                        write!(self.writer, ",{value}")?;
                    }
                }
                None => {
                    write!(self.writer, "{frame},false")?;
                    for _ in 0..grid.samples() {
                        write!(self.writer, ",")?;
                    }
                }
            }
            writeln!(self.writer)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the grid as little-endian binary.
    ///
    /// Format: u64 (frames) + u64 (samples), then frames*samples f64 values
    /// (NaN in missing frames), then one validity byte (0/1) per frame.
    pub fn write_binary(&mut self, grid: &SliceGrid) -> Result<()> {
        self.writer.write_all(&(grid.frames() as u64).to_le_bytes())?;
        self.writer
            .write_all(&(grid.samples() as u64).to_le_bytes())?;
        for value in grid.data() {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        for &valid in grid.validity() {
            self.writer.write_all(&[u8::from(valid)])?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackslice_core::{GridDescriptor, Profile, Quantity};
    use tempfile::NamedTempFile;

    fn grid() -> SliceGrid {
        let descriptor =
            GridDescriptor::new(2, Quantity::new("Height", "nm")).with_spacing(0.5, "um");
        SliceGrid::assemble(
            descriptor,
            vec![
                Some(Profile::new(vec![1.5, 2.5])),
                None,
                Some(Profile::new(vec![-1.0, 0.0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_grid_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = GridWriter::create(file.path()).unwrap();
        writer.write_csv(&grid()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "frame,valid,0,0.5");
        assert_eq!(lines[1], "0,true,1.5,2.5");
        assert_eq!(lines[2], "1,false,,");
        assert_eq!(lines[3], "2,true,-1,0");
    }

    #[test]
    fn test_write_grid_binary() {
        let mut writer = GridWriter::new(Vec::new());
        writer.write_binary(&grid()).unwrap();
        let data = writer.into_inner();

        // 16 (header) + 3 * 2 * 8 (values) + 3 (validity) = 67 bytes
        assert_eq!(data.len(), 67);
        assert_eq!(u64::from_le_bytes(data[0..8].try_into().unwrap()), 3);
        assert_eq!(u64::from_le_bytes(data[8..16].try_into().unwrap()), 2);
        let missing = f64::from_le_bytes(data[32..40].try_into().unwrap());
        assert!(missing.is_nan());
        assert_eq!(&data[64..], &[1, 0, 1]);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(GridFormat::from_path("out.CSV"), GridFormat::Csv);
        assert_eq!(GridFormat::from_path("out.bin"), GridFormat::Binary);
        assert_eq!(GridFormat::from_path("out"), GridFormat::Binary);
    }
}
