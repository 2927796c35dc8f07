//! JSON stack files.
//!
//! A stack file holds an ordered list of channels:
//!
//! ```json
//! { "channels": [
//!     { "name": "frame-0", "width": 2, "height": 1, "data": [0.1, 0.2],
//!       "quantity": { "name": "Height", "unit": "nm" } }
//! ] }
//! ```
//!
//! `quantity` is optional. Every channel is validated on load.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use stackslice_core::{Channel, Quantity};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct ChannelRecord {
    name: String,
    width: usize,
    height: usize,
    data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<QuantityRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuantityRecord {
    name: String,
    #[serde(default)]
    unit: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StackRecord {
    channels: Vec<ChannelRecord>,
}

/// Reads a channel stack from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or a
/// channel's data does not match its dimensions.
pub fn read_stack<P: AsRef<Path>>(path: P) -> Result<Vec<Channel>> {
    let file = File::open(path.as_ref())?;
    let channels = read_stack_from(BufReader::new(file))?;
    log::debug!(
        "read {} channels from {}",
        channels.len(),
        path.as_ref().display()
    );
    Ok(channels)
}

/// Reads a channel stack from any reader.
///
/// # Errors
/// See [`read_stack`].
pub fn read_stack_from<R: Read>(reader: R) -> Result<Vec<Channel>> {
    let stack: StackRecord = serde_json::from_reader(reader)?;
    stack
        .channels
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let quantity = record.quantity.map(|q| Quantity::new(q.name, q.unit));
            let channel = Channel::new(record.name, record.width, record.height, record.data)
                .map_err(|e| Error::InvalidFormat(format!("channel {i}: {e}")))?;
            Ok(match quantity {
                Some(q) => channel.with_quantity(q),
                None => channel,
            })
        })
        .collect()
}

/// Writes a channel stack as a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_stack<P: AsRef<Path>>(path: P, channels: &[Channel]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_stack_to(&mut writer, channels)?;
    writer.flush()?;
    Ok(())
}

/// Writes a channel stack as JSON to any writer.
///
/// # Errors
/// Returns an error if serialization or the writer fails.
pub fn write_stack_to<W: Write>(writer: W, channels: &[Channel]) -> Result<()> {
    let stack = StackRecord {
        channels: channels
            .iter()
            .map(|c| ChannelRecord {
                name: c.name.clone(),
                width: c.width(),
                height: c.height(),
                data: c.data().to_vec(),
                quantity: c.quantity.as_ref().map(|q| QuantityRecord {
                    name: q.name.clone(),
                    unit: q.unit.clone(),
                }),
            })
            .collect(),
    };
    serde_json::to_writer(writer, &stack)?;
    Ok(())
}
