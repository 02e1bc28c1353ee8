use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use zonegw_envelope::{BusFrame, PcieEnvelope};
use zonegw_gateway::ZoneStats;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EnvelopeOutput {
    zone_id: u32,
    device_id: u32,
    message_id: u32,
    priority: u32,
    protocol: &'static str,
    timestamp_us: u64,
    #[serde(flatten)]
    frame: FrameOutput,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum FrameOutput {
    Can {
        dlc: u8,
        flags: u8,
        data: String,
    },
    Lin {
        dlc: u8,
        checksum: u8,
        data: String,
    },
    Flexray {
        channel: u8,
        cycle: u8,
        data: String,
    },
    Ethernet {
        dest_mac: String,
        src_mac: String,
        data: String,
    },
}

impl From<&BusFrame> for FrameOutput {
    fn from(frame: &BusFrame) -> Self {
        match frame {
            BusFrame::Can(f) => FrameOutput::Can {
                dlc: f.dlc,
                flags: f.flags,
                data: hex(f.payload()),
            },
            BusFrame::Lin(f) => FrameOutput::Lin {
                dlc: f.dlc,
                checksum: f.checksum,
                data: hex(f.payload()),
            },
            BusFrame::FlexRay(f) => FrameOutput::Flexray {
                channel: f.channel,
                cycle: f.cycle,
                data: hex(f.payload()),
            },
            BusFrame::Ethernet(f) => FrameOutput::Ethernet {
                dest_mac: mac(&f.dest_mac),
                src_mac: mac(&f.src_mac),
                data: hex(&f.payload),
            },
        }
    }
}

pub fn print_envelope(envelope: &PcieEnvelope, format: OutputFormat) {
    let frame = &envelope.inner().frame;
    match format {
        OutputFormat::Json => {
            let out = EnvelopeOutput {
                zone_id: envelope.zone_id(),
                device_id: envelope.device_id(),
                message_id: envelope.message_id(),
                priority: envelope.priority(),
                protocol: envelope.tag().name(),
                timestamp_us: envelope.inner().timestamp_us,
                frame: FrameOutput::from(frame),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ZONE", "DEVICE", "PROTOCOL", "ID", "PRIO", "DATA"])
                .add_row(vec![
                    envelope.zone_id().to_string(),
                    envelope.device_id().to_string(),
                    envelope.tag().to_string(),
                    format!("{:#X}", envelope.message_id()),
                    envelope.priority().to_string(),
                    frame_data(frame),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "zone={} device={} {} id={:#X} prio={} t={}us data={}",
                envelope.zone_id(),
                envelope.device_id(),
                envelope.tag(),
                envelope.message_id(),
                envelope.priority(),
                envelope.inner().timestamp_us,
                frame_data(frame)
            );
        }
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    direction: &'a str,
    forwarded: u64,
    ignored: u64,
    retried: u64,
}

pub fn print_stats(direction: &str, stats: &ZoneStats, format: OutputFormat) {
    let out = StatsOutput {
        direction,
        forwarded: stats.forwarded,
        ignored: stats.ignored,
        retried: stats.retried,
    };
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["DIRECTION", "FORWARDED", "IGNORED", "RETRIED"])
                .add_row(vec![
                    out.direction.to_string(),
                    out.forwarded.to_string(),
                    out.ignored.to_string(),
                    out.retried.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}: forwarded={} ignored={} retried={}",
                out.direction, out.forwarded, out.ignored, out.retried
            );
        }
    }
}

fn frame_data(frame: &BusFrame) -> String {
    match frame {
        BusFrame::Can(f) => hex(f.payload()),
        BusFrame::Lin(f) => hex(f.payload()),
        BusFrame::FlexRay(f) => hex(f.payload()),
        BusFrame::Ethernet(f) => hex(&f.payload),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn mac(addr: &[u8; 6]) -> String {
    addr.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
