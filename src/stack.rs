use crate::{config::STACK_SIZE, error::runtime::StackError};

/// ## Size limited operand stack
///
/// Owned by the host and lent to each runtime for the length of a tick.

pub struct Stack<T = f64> {
    capacity: usize,
    vec: Vec<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.vec)
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Stack::new(STACK_SIZE)
    }
}

impl<T> Stack<T> {
    pub fn new(capacity: usize) -> Stack<T> {
        Stack {
            capacity,
            vec: Vec::with_capacity(capacity),
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn clear(&mut self) {
        self.vec.clear()
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.vec.len() >= self.capacity
    }
    pub fn last(&self) -> Option<&T> {
        self.vec.last()
    }
    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }
    pub fn push(&mut self, val: T) -> Result<(), StackError> {
        if self.is_full() {
            return Err(StackError::Overflow(self.capacity));
        }
        self.vec.push(val);
        Ok(())
    }
    pub fn pop(&mut self) -> Result<T, StackError> {
        self.vec.pop().ok_or(StackError::Underflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded() {
        let mut stack = Stack::new(2);
        stack.push(1.0).unwrap();
        stack.push(2.0).unwrap();
        assert!(stack.is_full());
        assert_eq!(stack.push(3.0), Err(StackError::Overflow(2)));
        assert_eq!(stack.as_slice(), &[1.0, 2.0]);
        assert_eq!(stack.pop(), Ok(2.0));
        assert_eq!(stack.pop(), Ok(1.0));
        assert_eq!(stack.pop(), Err(StackError::Underflow));
    }

    #[test]
    fn default_capacity() {
        let stack: Stack = Stack::default();
        assert_eq!(stack.capacity(), 128);
        assert!(stack.is_empty());
    }
}
