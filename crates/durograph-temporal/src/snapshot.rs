//! Binary graph snapshots (`.dgs`): header + label table + bincode graph.

use crate::graph::TemporalGraph;
use crate::interner::LabelInterner;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 4] = b"DGSN";
const VERSION: u32 = 1;

impl TemporalGraph {
    /// Serialize the graph together with its label names.
    pub fn to_bytes(&self, labels: &LabelInterner) -> Result<Vec<u8>> {
        let label_bytes = labels.to_bytes()?;
        let graph_bytes = bincode::serialize(self)?;

        let mut result = Vec::with_capacity(8 + 16 + label_bytes.len() + graph_bytes.len());
        result.extend_from_slice(MAGIC);
        result.extend_from_slice(&VERSION.to_le_bytes());

        result.extend_from_slice(&(label_bytes.len() as u64).to_le_bytes());
        result.extend_from_slice(&label_bytes);

        result.extend_from_slice(&(graph_bytes.len() as u64).to_le_bytes());
        result.extend_from_slice(&graph_bytes);

        Ok(result)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, LabelInterner)> {
        if bytes.len() < 8 || &bytes[0..4] != MAGIC {
            return Err(anyhow!("not a durograph snapshot"));
        }

        let version = u32::from_le_bytes(bytes[4..8].try_into()?);
        if version != VERSION {
            return Err(anyhow!("unsupported snapshot version: {version}"));
        }

        let mut offset = 8;
        let label_bytes = read_section(bytes, &mut offset).context("label table")?;
        let labels = LabelInterner::from_bytes(label_bytes)?;

        let graph_bytes = read_section(bytes, &mut offset).context("graph body")?;
        let graph: TemporalGraph = bincode::deserialize(graph_bytes)?;

        Ok((graph, labels))
    }

    pub fn save(&self, labels: &LabelInterner, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(labels)?;
        fs::write(path, bytes).with_context(|| format!("writing snapshot {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<(Self, LabelInterner)> {
        let bytes =
            fs::read(path).with_context(|| format!("reading snapshot {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("decoding snapshot {}", path.display()))
    }
}

/// Read one `u64 length + payload` section, advancing `offset`.
fn read_section<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a [u8]> {
    let body = offset
        .checked_add(8)
        .ok_or_else(|| anyhow!("section header at byte {offset} overflows"))?;
    let header = bytes
        .get(*offset..body)
        .ok_or_else(|| anyhow!("truncated section header at byte {offset}"))?;
    let len = u64::from_le_bytes(header.try_into()?);
    let len = usize::try_from(len).map_err(|_| anyhow!("section length {len} does not fit in memory"))?;

    let end = body
        .checked_add(len)
        .ok_or_else(|| anyhow!("section of {len} bytes at byte {body} overflows"))?;
    let payload = bytes
        .get(body..end)
        .ok_or_else(|| anyhow!("truncated section of {len} bytes at byte {body}"))?;
    *offset = end;
    Ok(payload)
}
