//! Medium Auxiliary Memory
//!
//! MAM attributes live in the cartridge memory chip and are reached with
//! READ ATTRIBUTE / WRITE ATTRIBUTE passed through `sg_raw`. Parameter data
//! travels through temporary files so no hexdump parsing is involved.

use super::{device_arg, TapeOperations};
use crate::error::{LtfsAdminError, Result};
use crate::runner::CommandLine;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const READ_ATTRIBUTE: u8 = 0x8C;
pub const WRITE_ATTRIBUTE: u8 = 0x8D;

/// READ ATTRIBUTE service action returning attribute values
const SA_ATTRIBUTE_VALUES: u8 = 0x00;

const HEADER_LEN: usize = 4;
const ATTRIBUTE_HEADER_LEN: usize = 5;

const SINGLE_ALLOCATION: u32 = 1024;
const FULL_ALLOCATION: u32 = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MamAttributeFormat {
    Binary = 0x00,
    Ascii = 0x01,
    Text = 0x02,
}

impl MamAttributeFormat {
    /// Low two bits of the attribute flags byte; the reserved value reads as binary
    pub fn from_flags(flags: u8) -> Self {
        match flags & 0x03 {
            0x01 => Self::Ascii,
            0x02 => Self::Text,
            _ => Self::Binary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "BINARY",
            Self::Ascii => "ASCII",
            Self::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MamAttribute {
    pub id: u16,
    pub format: MamAttributeFormat,
    pub read_only: bool,
    pub data: Vec<u8>,
}

impl MamAttribute {
    pub fn name(&self) -> &'static str {
        attribute_name(self.id).unwrap_or("Unknown attribute")
    }

    pub fn display_value(&self) -> String {
        match self.format {
            MamAttributeFormat::Ascii | MamAttributeFormat::Text => {
                String::from_utf8_lossy(&self.data)
                    .trim_end_matches(|c: char| c == ' ' || c == '\0')
                    .to_string()
            }
            MamAttributeFormat::Binary if !self.data.is_empty() && self.data.len() <= 8 => self
                .data
                .iter()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
                .to_string(),
            MamAttributeFormat::Binary => hex::encode(&self.data),
        }
    }
}

pub fn attribute_name(id: u16) -> Option<&'static str> {
    let name = match id {
        0x0000 => "Remaining Capacity In Partition (MiB)",
        0x0001 => "Maximum Capacity In Partition (MiB)",
        0x0002 => "TapeAlert Flags",
        0x0003 => "Load Count",
        0x0004 => "MAM Space Remaining",
        0x0005 => "Assigning Organization",
        0x0006 => "Format Density Code",
        0x0007 => "Initialization Count",
        0x0220 => "Total MiB Written In Medium Life",
        0x0221 => "Total MiB Read In Medium Life",
        0x0222 => "Total MiB Written In Current Load",
        0x0223 => "Total MiB Read In Current Load",
        0x0400 => "Medium Manufacturer",
        0x0401 => "Medium Serial Number",
        0x0402 => "Medium Length",
        0x0403 => "Medium Width",
        0x0404 => "Medium Assigning Organization",
        0x0405 => "Medium Density Code",
        0x0406 => "Medium Manufacture Date",
        0x0407 => "MAM Capacity",
        0x0408 => "Medium Type",
        0x0409 => "Medium Type Information",
        0x0800 => "Application Vendor",
        0x0801 => "Application Name",
        0x0802 => "Application Version",
        0x0803 => "User Medium Text Label",
        0x0804 => "Date And Time Last Written",
        0x0805 => "Text Localization Identifier",
        0x0806 => "Barcode",
        0x0807 => "Owning Host Textual Name",
        0x0808 => "Media Pool",
        0x080B => "Application Format Version",
        _ => return None,
    };
    Some(name)
}

/// Host-writable attributes with their fixed format and length
pub fn writable_attribute(id: u16) -> Option<(MamAttributeFormat, usize)> {
    use MamAttributeFormat::*;
    match id {
        0x0800 => Some((Ascii, 8)),
        0x0801 => Some((Ascii, 32)),
        0x0802 => Some((Ascii, 8)),
        0x0803 => Some((Text, 160)),
        0x0804 => Some((Ascii, 12)),
        0x0805 => Some((Binary, 1)),
        0x0806 => Some((Ascii, 32)),
        _ => None,
    }
}

pub fn read_attribute_cdb(first_id: u16, partition: u8, allocation: u32) -> [u8; 16] {
    let mut cdb = [0u8; 16];
    cdb[0] = READ_ATTRIBUTE;
    cdb[1] = SA_ATTRIBUTE_VALUES;
    // bytes 2-4 restricted, 5 volume number, 6 reserved
    cdb[7] = partition;
    cdb[8..10].copy_from_slice(&first_id.to_be_bytes());
    cdb[10..14].copy_from_slice(&allocation.to_be_bytes());
    cdb
}

pub fn write_attribute_cdb(partition: u8, parameter_length: u32) -> [u8; 16] {
    let mut cdb = [0u8; 16];
    cdb[0] = WRITE_ATTRIBUTE;
    cdb[7] = partition;
    cdb[10..14].copy_from_slice(&parameter_length.to_be_bytes());
    cdb
}

fn cdb_tokens(cdb: &[u8]) -> impl Iterator<Item = String> + '_ {
    cdb.iter().map(|b| format!("{:02x}", b))
}

/// Decode READ ATTRIBUTE parameter data. A trailing attribute cut short by
/// the allocation length is dropped.
pub fn parse_attribute_data(bytes: &[u8]) -> Result<Vec<MamAttribute>> {
    if bytes.len() < HEADER_LEN {
        return Err(LtfsAdminError::parse(format!(
            "attribute data too short: {} bytes",
            bytes.len()
        )));
    }

    let available = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = bytes.len().min(HEADER_LEN + available);
    let mut attributes = Vec::new();
    let mut offset = HEADER_LEN;

    while offset + ATTRIBUTE_HEADER_LEN <= end {
        let id = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        let flags = bytes[offset + 2];
        let length = u16::from_be_bytes([bytes[offset + 3], bytes[offset + 4]]) as usize;
        let value_start = offset + ATTRIBUTE_HEADER_LEN;
        if value_start + length > end {
            debug!("Attribute 0x{:04X} truncated, stopping", id);
            break;
        }

        attributes.push(MamAttribute {
            id,
            format: MamAttributeFormat::from_flags(flags),
            read_only: flags & 0x80 != 0,
            data: bytes[value_start..value_start + length].to_vec(),
        });
        offset = value_start + length;
    }

    Ok(attributes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MamWrite {
    pub id: u16,
    /// Text for ASCII/TEXT attributes, hex digits for BINARY ones
    pub value: String,
    pub partition: u8,
}

impl MamWrite {
    /// WRITE ATTRIBUTE parameter list holding the single padded attribute
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (format, size) = writable_attribute(self.id).ok_or_else(|| {
            LtfsAdminError::parameter_validation(format!(
                "attribute 0x{:04X} is not host-writable",
                self.id
            ))
        })?;

        let mut value = match format {
            MamAttributeFormat::Ascii => {
                if !self.value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
                    return Err(LtfsAdminError::parameter_validation(format!(
                        "attribute 0x{:04X} only accepts printable ASCII",
                        self.id
                    )));
                }
                self.value.as_bytes().to_vec()
            }
            MamAttributeFormat::Text => self.value.as_bytes().to_vec(),
            MamAttributeFormat::Binary => {
                let digits = self.value.trim_start_matches("0x");
                let digits = if digits.len() % 2 == 1 {
                    format!("0{}", digits)
                } else {
                    digits.to_string()
                };
                hex::decode(&digits).map_err(|e| {
                    LtfsAdminError::parameter_validation(format!("invalid hex value: {}", e))
                })?
            }
        };

        if value.len() > size {
            return Err(LtfsAdminError::parameter_validation(format!(
                "value for attribute 0x{:04X} is {} bytes, limit is {}",
                self.id,
                value.len(),
                size
            )));
        }

        match format {
            MamAttributeFormat::Ascii => value.resize(size, b' '),
            MamAttributeFormat::Text => value.resize(size, 0),
            MamAttributeFormat::Binary => {
                let mut padded = vec![0u8; size - value.len()];
                padded.extend_from_slice(&value);
                value = padded;
            }
        }

        let attribute_len = ATTRIBUTE_HEADER_LEN + size;
        let mut list = Vec::with_capacity(HEADER_LEN + attribute_len);
        list.extend_from_slice(&(attribute_len as u32).to_be_bytes());
        list.extend_from_slice(&self.id.to_be_bytes());
        list.push(format as u8);
        list.extend_from_slice(&(size as u16).to_be_bytes());
        list.extend_from_slice(&value);
        Ok(list)
    }
}

impl TapeOperations {
    /// `tapeinfo -f` cartridge summary
    pub async fn mam_summary(&self, device: &Path) -> Result<String> {
        let command = CommandLine::new("tapeinfo").arg("-f").arg(device_arg(device));
        Ok(self.runner.run(&command).await.into_result(&command)?.stdout)
    }

    /// Read one attribute, or every attribute in the partition when `id` is `None`
    pub async fn read_mam(
        &self,
        device: &Path,
        id: Option<u16>,
        partition: u8,
    ) -> Result<Vec<MamAttribute>> {
        let allocation = if id.is_some() {
            SINGLE_ALLOCATION
        } else {
            FULL_ALLOCATION
        };
        let cdb = read_attribute_cdb(id.unwrap_or(0), partition, allocation);
        let response = tempfile::NamedTempFile::new()?;

        let command = CommandLine::new("sg_raw")
            .arg("-r")
            .arg(allocation.to_string())
            .arg("-o")
            .arg(response.path().to_string_lossy())
            .arg(device_arg(device))
            .args(cdb_tokens(&cdb));
        self.runner.run(&command).await.into_result(&command)?;

        let bytes = tokio::fs::read(response.path()).await?;
        let mut attributes = parse_attribute_data(&bytes)?;
        if let Some(id) = id {
            attributes.retain(|a| a.id == id);
        }
        debug!("Read {} MAM attributes from {}", attributes.len(), device.display());
        Ok(attributes)
    }

    pub async fn write_mam(&self, device: &Path, write: &MamWrite) -> Result<()> {
        let list = write.encode()?;
        let cdb = write_attribute_cdb(write.partition, list.len() as u32);

        let mut payload = tempfile::NamedTempFile::new()?;
        payload.write_all(&list)?;
        payload.flush()?;

        let command = CommandLine::new("sg_raw")
            .arg("-s")
            .arg(list.len().to_string())
            .arg("-i")
            .arg(payload.path().to_string_lossy())
            .arg(device_arg(device))
            .args(cdb_tokens(&cdb));

        info!(
            "Writing MAM attribute 0x{:04X} on {}",
            write.id,
            device.display()
        );
        self.runner.run(&command).await.into_result(&command)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::scripted::ScriptedRunner;
    use crate::runner::{CommandOutput, CommandRunner};
    use crate::tape_ops::test_operations;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Plays the drive side of sg_raw: fills `-o` files, captures `-i` files
    #[derive(Default)]
    struct SgRawStub {
        response: Vec<u8>,
        received: Mutex<Vec<Vec<u8>>>,
        commands: Mutex<Vec<CommandLine>>,
    }

    #[async_trait]
    impl CommandRunner for SgRawStub {
        async fn run(&self, command: &CommandLine) -> CommandOutput {
            self.commands.lock().unwrap().push(command.clone());
            let args = &command.args;
            if let Some(i) = args.iter().position(|a| a == "-o") {
                std::fs::write(&args[i + 1], &self.response).unwrap();
            }
            if let Some(i) = args.iter().position(|a| a == "-i") {
                let data = std::fs::read(&args[i + 1]).unwrap();
                self.received.lock().unwrap().push(data);
            }
            CommandOutput::success("")
        }
    }

    fn sample_response() -> Vec<u8> {
        let mut body = Vec::new();
        // Load Count, binary, read-only
        body.extend_from_slice(&[0x00, 0x03, 0x80, 0x00, 0x08]);
        body.extend_from_slice(&42u64.to_be_bytes());
        // Barcode, ASCII
        body.extend_from_slice(&[0x08, 0x06, 0x01, 0x00, 0x08]);
        body.extend_from_slice(b"ABC123L8");

        let mut data = (body.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(&body);
        data
    }

    #[test]
    fn test_read_attribute_cdb_layout() {
        let cdb = read_attribute_cdb(0x0401, 1, 1024);
        assert_eq!(
            cdb,
            [0x8C, 0x00, 0, 0, 0, 0, 0, 0x01, 0x04, 0x01, 0, 0, 0x04, 0x00, 0, 0]
        );
    }

    #[test]
    fn test_write_attribute_cdb_layout() {
        let cdb = write_attribute_cdb(0, 17);
        assert_eq!(cdb[0], 0x8D);
        assert_eq!(&cdb[10..14], &[0, 0, 0, 17]);
    }

    #[test]
    fn test_parse_attribute_data() {
        let attributes = parse_attribute_data(&sample_response()).unwrap();
        assert_eq!(attributes.len(), 2);

        assert_eq!(attributes[0].name(), "Load Count");
        assert!(attributes[0].read_only);
        assert_eq!(attributes[0].display_value(), "42");

        assert_eq!(attributes[1].format, MamAttributeFormat::Ascii);
        assert!(!attributes[1].read_only);
        assert_eq!(attributes[1].display_value(), "ABC123L8");
    }

    #[test]
    fn test_parse_drops_truncated_attribute() {
        let mut data = sample_response();
        data.truncate(data.len() - 3);
        let attributes = parse_attribute_data(&data).unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].id, 0x0003);

        assert!(parse_attribute_data(&[0, 0]).is_err());
    }

    #[test]
    fn test_encode_pads_per_format() {
        let ascii = MamWrite {
            id: 0x0800,
            value: "ACME".into(),
            partition: 0,
        }
        .encode()
        .unwrap();
        assert_eq!(&ascii[..4], &[0, 0, 0, 13]);
        assert_eq!(&ascii[4..9], &[0x08, 0x00, 0x01, 0x00, 0x08]);
        assert_eq!(&ascii[9..], b"ACME    ");

        let text = MamWrite {
            id: 0x0803,
            value: "Archive".into(),
            partition: 0,
        }
        .encode()
        .unwrap();
        assert_eq!(text.len(), 4 + 5 + 160);
        assert_eq!(text[6], 0x02);
        assert!(text[4 + 5 + 7..].iter().all(|b| *b == 0));

        let binary = MamWrite {
            id: 0x0805,
            value: "0x1".into(),
            partition: 0,
        }
        .encode()
        .unwrap();
        assert_eq!(&binary[4..], &[0x08, 0x05, 0x00, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_encode_rejects_bad_values() {
        let too_long = MamWrite {
            id: 0x0800,
            value: "VENDORNAME".into(),
            partition: 0,
        };
        assert!(matches!(
            too_long.encode(),
            Err(LtfsAdminError::ParameterValidation(_))
        ));

        let read_only = MamWrite {
            id: 0x0401,
            value: "X".into(),
            partition: 0,
        };
        assert!(read_only.encode().is_err());

        let bad_hex = MamWrite {
            id: 0x0805,
            value: "zz".into(),
            partition: 0,
        };
        assert!(bad_hex.encode().is_err());
    }

    #[tokio::test]
    async fn test_read_mam_single_attribute() {
        let stub = Arc::new(SgRawStub {
            response: sample_response(),
            ..Default::default()
        });
        let ops = test_operations(stub.clone());

        let attributes = ops
            .read_mam(Path::new("/dev/nst0"), Some(0x0806), 0)
            .await
            .unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].display_value(), "ABC123L8");

        let commands = stub.commands.lock().unwrap();
        let args = &commands[0].args;
        assert_eq!(commands[0].program, "sg_raw");
        assert_eq!(args[0..2], ["-r".to_string(), "1024".to_string()]);
        assert_eq!(args[4], "/dev/nst0");
        assert_eq!(args[5], "8c");
        assert_eq!(args[13], "08");
        assert_eq!(args[14], "06");
    }

    #[tokio::test]
    async fn test_write_mam_sends_parameter_list() {
        let stub = Arc::new(SgRawStub::default());
        let ops = test_operations(stub.clone());
        let write = MamWrite {
            id: 0x0806,
            value: "ABC123L8".into(),
            partition: 1,
        };

        ops.write_mam(Path::new("/dev/nst0"), &write).await.unwrap();

        let received = stub.received.lock().unwrap();
        assert_eq!(received[0], write.encode().unwrap());
        let commands = stub.commands.lock().unwrap();
        assert_eq!(commands[0].args[1], "41");
        assert_eq!(commands[0].args[5], "8d");
        assert_eq!(commands[0].args[12], "01");
    }

    #[tokio::test]
    async fn test_summary_failure_is_command_failed() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("tapeinfo", CommandOutput::failure("no medium")),
        );
        let ops = test_operations(runner);
        let err = ops.mam_summary(Path::new("/dev/sg1")).await.unwrap_err();
        assert!(matches!(err, LtfsAdminError::CommandFailed { .. }));
    }
}
