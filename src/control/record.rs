use std::fmt;

/// One complete line received on the control channel, without its LF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(String);

impl RawLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-separated fields
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    /// Merge this line into a typed record
    pub fn parse<T: ControlRecord>(&self, current: T) -> T {
        current.merge(self)
    }
}

impl fmt::Display for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed shape of a Kernel's control line.
///
/// Parsing is best-effort: every field that parses replaces the current
/// value, the rest keep theirs.
pub trait ControlRecord: Sized + Copy {
    /// Number of fields in one record
    const FIELDS: usize;

    fn merge(self, line: &RawLine) -> Self;
}

impl ControlRecord for f32 {
    const FIELDS: usize = 1;

    fn merge(self, line: &RawLine) -> Self {
        line.fields()
            .next()
            .and_then(|f| f.parse().ok())
            .unwrap_or(self)
    }
}

impl ControlRecord for (f32, f32) {
    const FIELDS: usize = 2;

    fn merge(self, line: &RawLine) -> Self {
        let mut fields = line.fields();
        let first = fields.next().and_then(|f| f.parse().ok()).unwrap_or(self.0);
        let second = fields.next().and_then(|f| f.parse().ok()).unwrap_or(self.1);
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_float() {
        assert_eq!(RawLine::new("0.25").parse(1.0f32), 0.25);
        assert_eq!(RawLine::new(" -3e-2 trailing").parse(1.0f32), -0.03);
    }

    #[test]
    fn test_malformed_keeps_current() {
        assert_eq!(RawLine::new("abc").parse(1.5f32), 1.5);
        assert_eq!(RawLine::new("").parse(1.5f32), 1.5);
    }

    #[test]
    fn test_two_floats_partial_update() {
        assert_eq!(RawLine::new("0.1 0.2").parse((0.0f32, 0.0f32)), (0.1, 0.2));
        assert_eq!(RawLine::new("0.7").parse((0.0f32, 0.5f32)), (0.7, 0.5));
        assert_eq!(RawLine::new("x 0.9").parse((0.3f32, 0.5f32)), (0.3, 0.9));
    }
}
