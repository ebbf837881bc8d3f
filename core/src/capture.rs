use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::events::{format_clock, ProtocolEvent};
use crate::packet::PacketKind;
use crate::traits::EventSink;
use crate::NodeId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub time: f64,
    pub packet: PacketKind,
    pub src: NodeId,
    pub dst: NodeId,
    pub hop_count: usize,
    pub seq: u32,
}

impl CaptureRecord {
    pub fn info(&self) -> String {
        format!(
            "AODV {}: Node {} -> Node {} (Hops: {}, Seq: {})",
            self.packet.description(),
            self.src,
            self.dst,
            self.hop_count,
            self.seq
        )
    }
}

/// Per-session record of every packet transmission, exportable as a
/// line-oriented text dump.
#[derive(Clone, Debug, Default)]
pub struct Capture {
    pub records: Vec<CaptureRecord>,
    next_seq: u32,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.next_seq = 0;
    }

    pub fn write_report<W: Write>(
        &self,
        out: &mut W,
        source: Option<NodeId>,
        destination: Option<NodeId>,
    ) -> io::Result<()> {
        let fmt_id = |id: Option<NodeId>| id.map_or_else(|| "None".to_string(), |v| v.to_string());
        writeln!(out, "# AODV Simulation PCAP Dump")?;
        writeln!(out, "# Generated by AODV Simulator")?;
        writeln!(
            out,
            "# Source: {}, Destination: {}",
            fmt_id(source),
            fmt_id(destination)
        )?;
        writeln!(out, "# Total Packets: {}", self.records.len())?;
        writeln!(out, "# Timestamp,Protocol,Source,Destination,Info")?;
        for r in &self.records {
            writeln!(
                out,
                "{},AODV,Node_{},Node_{},\"{}\"",
                format_clock(r.time),
                r.src,
                r.dst,
                r.info()
            )?;
        }
        Ok(())
    }
}

impl EventSink for Capture {
    fn record(&mut self, event: &ProtocolEvent) {
        if !event.kind.is_transmission() {
            return;
        }
        let (Some(packet), Some((src, dst))) = (event.packet, event.link) else {
            return;
        };
        self.next_seq += 1;
        self.records.push(CaptureRecord {
            time: event.time,
            packet,
            src,
            dst,
            hop_count: event.hop_count.unwrap_or(1),
            seq: self.next_seq,
        });
    }

    fn clear(&mut self) {
        self.reset();
    }
}
