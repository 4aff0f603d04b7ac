use crate::attributes::AttributeDescriptor;
use crate::error::SequenceError;
use crate::types::Direction;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SequenceController {
    attributes: Vec<AttributeDescriptor>,
    index: usize,
}

/// What the range slider shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliderState {
    pub min: usize,
    pub max: usize,
    pub step: usize,
    pub value: usize,
}

impl SequenceController {
    pub fn new(attributes: Vec<AttributeDescriptor>) -> Result<Self, SequenceError> {
        if attributes.is_empty() {
            return Err(SequenceError::Empty);
        }
        Ok(Self { attributes, index: 0 })
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn current_attribute(&self) -> &AttributeDescriptor {
        &self.attributes[self.index]
    }

    /// Moves one attribute, wrapping at both ends.
    pub fn step(&mut self, direction: Direction) -> &AttributeDescriptor {
        let last = self.attributes.len() - 1;
        self.index = match direction {
            Direction::Forward if self.index >= last => 0,
            Direction::Forward => self.index + 1,
            Direction::Reverse if self.index == 0 => last,
            Direction::Reverse => self.index - 1,
        };
        self.current_attribute()
    }

    pub fn set_index(&mut self, index: usize) -> Result<&AttributeDescriptor, SequenceError> {
        if index >= self.attributes.len() {
            return Err(SequenceError::OutOfRange { index, len: self.attributes.len() });
        }
        self.index = index;
        Ok(self.current_attribute())
    }

    pub fn slider(&self) -> SliderState {
        SliderState {
            min: 0,
            max: self.attributes.len() - 1,
            step: 1,
            value: self.index,
        }
    }
}
