//! Text comment payloads serialized as a bag of cells.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::transaction::TransactionMessage;

/// Byte capacity of a cell (1023 bits, byte aligned)
const CELL_CAPACITY: usize = 127;
const COMMENT_OP: [u8; 4] = [0, 0, 0, 0];
const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// A byte-aligned ordinary cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    refs: Vec<Cell>,
}

impl Cell {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }
}

/// Build a comment cell: 32-bit zero op followed by the UTF-8 text,
/// continued in a chain of child cells when it does not fit
pub fn comment_cell(comment: &str) -> Cell {
    let text = comment.as_bytes();
    let head_len = text.len().min(CELL_CAPACITY - COMMENT_OP.len());

    let mut chunks: Vec<&[u8]> = vec![&text[..head_len]];
    chunks.extend(text[head_len..].chunks(CELL_CAPACITY));

    let mut tail: Option<Cell> = None;
    for chunk in chunks.iter().skip(1).rev() {
        tail = Some(Cell {
            data: chunk.to_vec(),
            refs: tail.into_iter().collect(),
        });
    }

    let mut data = COMMENT_OP.to_vec();
    data.extend_from_slice(chunks[0]);
    Cell {
        data,
        refs: tail.into_iter().collect(),
    }
}

/// Serialize a cell tree into a bag of cells without index or checksum
pub fn serialize_boc(root: &Cell) -> Vec<u8> {
    let mut ordered: Vec<&Cell> = Vec::new();
    flatten(root, &mut ordered);

    let size_bytes = bytes_needed(ordered.len() as u64);

    // Children are laid out after their parent in pre-order
    let mut indices = Vec::with_capacity(ordered.len());
    let mut next = 0usize;
    assign_indices(root, &mut next, &mut indices);

    let mut cells_data = Vec::new();
    for (cell, child_indices) in ordered.iter().zip(indices.iter()) {
        cells_data.push(cell.refs.len() as u8);
        cells_data.push((cell.data.len() * 2) as u8);
        cells_data.extend_from_slice(&cell.data);
        for idx in child_indices {
            cells_data.extend_from_slice(&be_bytes(*idx as u64, size_bytes));
        }
    }

    let offset_bytes = bytes_needed(cells_data.len() as u64);

    let mut out = Vec::with_capacity(cells_data.len() + 16);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(size_bytes as u8);
    out.push(offset_bytes as u8);
    out.extend_from_slice(&be_bytes(ordered.len() as u64, size_bytes));
    out.extend_from_slice(&be_bytes(1, size_bytes));
    out.extend_from_slice(&be_bytes(0, size_bytes));
    out.extend_from_slice(&be_bytes(cells_data.len() as u64, offset_bytes));
    out.extend_from_slice(&be_bytes(0, size_bytes));
    out.extend_from_slice(&cells_data);
    out
}

/// Base64 bag of cells carrying a text comment
pub fn comment_payload(comment: &str) -> String {
    STANDARD.encode(serialize_boc(&comment_cell(comment)))
}

/// Transfer message with an optional human-readable comment
pub fn comment_message(destination: &str, amount: u64, comment: &str) -> TransactionMessage {
    let payload = if comment.is_empty() {
        None
    } else {
        Some(comment_payload(comment))
    };
    TransactionMessage::new(destination, amount, payload)
}

fn flatten<'a>(cell: &'a Cell, out: &mut Vec<&'a Cell>) {
    out.push(cell);
    for child in &cell.refs {
        flatten(child, out);
    }
}

fn assign_indices(cell: &Cell, next: &mut usize, out: &mut Vec<Vec<usize>>) {
    let slot = out.len();
    out.push(Vec::new());
    *next += 1;
    for child in &cell.refs {
        out[slot].push(*next);
        assign_indices(child, next, out);
    }
}

fn bytes_needed(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn be_bytes(value: u64, width: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - width..].to_vec()
}
