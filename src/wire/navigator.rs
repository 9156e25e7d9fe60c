//! A stateful cursor that walks a message one field at a time, descending
//! into nested length-delimited values and groups on request and popping
//! back out again — the building block for hosts that want to inspect a
//! message without going through the typed decoder.

use super::codec::{Tag, WireType};
use super::slice::Reader;
use super::WireError;

/// One step yielded by [`Navigator::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub tag: Tag,
}

/// A single-pass cursor over a message buffer with a stack of enclosing
/// views. `enter` pushes the current reader and narrows to the
/// length-delimited or group body just read; `leave` pops back to the
/// enclosing view, resuming right after the value that was entered.
#[derive(Debug)]
pub struct Navigator<'a> {
    current: Reader<'a>,
    stack: Vec<Reader<'a>>,
    last_tag: Option<Tag>,
}

impl<'a> Navigator<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Navigator {
            current: Reader::new(buf),
            stack: Vec::new(),
            last_tag: None,
        }
    }

    /// Depth of nested views currently entered.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Reads the next tag in the current view, or `None` once the view is
    /// exhausted.
    pub fn next(&mut self) -> Result<Option<Step>, WireError> {
        if self.current.is_empty() {
            self.last_tag = None;
            return Ok(None);
        }
        let tag = self.current.read_tag()?;
        self.last_tag = Some(tag);
        Ok(Some(Step { tag }))
    }

    /// Descends into the length-delimited or start-group value most
    /// recently yielded by [`Navigator::next`]. Returns the current depth
    /// after descending.
    pub fn enter(&mut self) -> Result<usize, WireError> {
        let tag = self.last_tag.ok_or(WireError::Truncated)?;
        let body = match tag.wire_type {
            WireType::LengthDelimited => self.current.read_bytes()?,
            WireType::StartGroup => self.current.read_group(tag.field)?,
            _ => return Err(WireError::MalformedVarint),
        };
        self.stack.push(self.current);
        self.current = Reader::new(body);
        self.last_tag = None;
        Ok(self.stack.len())
    }

    /// Pops back out to the enclosing view, resuming right after the value
    /// that was entered. A no-op at depth 0.
    pub fn leave(&mut self) {
        if let Some(parent) = self.stack.pop() {
            self.current = parent;
            self.last_tag = None;
        }
    }

    /// Skips the value most recently yielded by [`Navigator::next`] without
    /// entering it.
    pub fn skip(&mut self) -> Result<(), WireError> {
        let tag = self.last_tag.take().ok_or(WireError::Truncated)?;
        self.current.skip_value(tag.wire_type)
    }
}

#[cfg(test)]
mod tests {
    use super::super::buffer::Writer;
    use super::*;

    #[test]
    fn flat_walk_visits_every_field() {
        let mut w = Writer::new();
        w.write_tag(1, WireType::Varint);
        w.write_varint(1);
        w.write_tag(2, WireType::Varint);
        w.write_varint(2);
        let bytes = w.into_vec();

        let mut nav = Navigator::new(&bytes);
        let mut fields = Vec::new();
        while let Some(step) = nav.next().unwrap() {
            fields.push(step.tag.field);
            nav.skip().unwrap();
        }
        assert_eq!(fields, vec![1, 2]);
    }

    #[test]
    fn enter_and_leave_restores_outer_position() {
        let mut inner = Writer::new();
        inner.write_tag(1, WireType::Varint);
        inner.write_varint(150);
        let inner_bytes = inner.into_vec();

        let mut outer = Writer::new();
        outer.write_tag(1, WireType::LengthDelimited);
        outer.write_bytes(&inner_bytes);
        outer.write_tag(2, WireType::Varint);
        outer.write_varint(7);
        let bytes = outer.into_vec();

        let mut nav = Navigator::new(&bytes);
        nav.next().unwrap();
        nav.enter().unwrap();
        assert_eq!(nav.depth(), 1);
        let inner_step = nav.next().unwrap().unwrap();
        assert_eq!(inner_step.tag.field, 1);
        nav.leave();
        assert_eq!(nav.depth(), 0);

        let step = nav.next().unwrap().unwrap();
        assert_eq!(step.tag.field, 2);
    }

    #[test]
    fn entering_a_varint_fails() {
        let mut w = Writer::new();
        w.write_tag(1, WireType::Varint);
        w.write_varint(1);
        let bytes = w.into_vec();

        let mut nav = Navigator::new(&bytes);
        nav.next().unwrap();
        assert_eq!(nav.enter(), Err(WireError::MalformedVarint));
    }
}
