//! Embedded text files with `__NAME__` placeholders.

use std::marker::PhantomData;

/// Values for the placeholders of one embedded file.
pub trait Slots {
    /// `(placeholder, value)` pairs, substituted in order. A value is
    /// scanned by every placeholder after it, so list untrusted ones last.
    fn slots(&self) -> Vec<(&'static str, String)>;

    /// Post-process the filled text.
    fn finish(&self, filled: String) -> String {
        filled
    }
}

/// A compiled-in file that only renders with its own [`Slots`] type.
#[derive(Debug, Clone, Copy)]
pub struct Embedded<S> {
    text: &'static str,
    _slots: PhantomData<fn(&S)>,
}

impl<S: Slots> Embedded<S> {
    pub const fn new(text: &'static str) -> Self {
        Self {
            text,
            _slots: PhantomData,
        }
    }

    pub fn render(&self, slots: &S) -> String {
        let filled = slots
            .slots()
            .into_iter()
            .fold(self.text.to_owned(), |text, (placeholder, value)| {
                text.replace(placeholder, &value)
            });
        slots.finish(filled)
    }
}
