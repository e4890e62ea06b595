use crate::core::{StageError, StageResult};
use std::str::FromStr;

/// Positional parameters handed to a Kernel factory
#[derive(Debug, Clone, Copy)]
pub struct KernelParams<'a> {
    command: &'a str,
    values: &'a [String],
}

impl<'a> KernelParams<'a> {
    pub fn new(command: &'a str, values: &'a [String]) -> Self {
        Self { command, values }
    }

    pub fn command(&self) -> &str {
        self.command
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_str(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn required<T: FromStr>(&self, index: usize, name: &str) -> StageResult<T> {
        let raw = self.get_str(index).ok_or_else(|| {
            StageError::Usage(format!("{}: need required parameter ({})", self.command, name))
        })?;
        self.parse(raw, name)
    }

    pub fn optional<T: FromStr>(&self, index: usize, name: &str, default: T) -> StageResult<T> {
        match self.get_str(index) {
            Some(raw) => self.parse(raw, name),
            None => Ok(default),
        }
    }

    fn parse<T: FromStr>(&self, raw: &str, name: &str) -> StageResult<T> {
        raw.trim().parse().map_err(|_| {
            StageError::Usage(format!("{}: cannot parse {} from {:?}", self.command, name, raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_optional() {
        let values = vec!["0.5".to_string(), "-3".to_string()];
        let params = KernelParams::new("gain_ff", &values);

        assert_eq!(params.required::<f32>(0, "gain").unwrap(), 0.5);
        assert_eq!(params.optional::<i32>(1, "shift", 0).unwrap(), -3);
        assert_eq!(params.optional::<i32>(2, "extra", 7).unwrap(), 7);
        assert!(matches!(params.required::<f32>(2, "missing"), Err(StageError::Usage(_))));
    }

    #[test]
    fn test_unparsable_is_usage_error() {
        let values = vec!["fast".to_string()];
        let params = KernelParams::new("shift_math_cc", &values);
        let err = params.required::<f32>(0, "rate").unwrap_err();
        assert_eq!(err.exit_code(), -1);
    }
}
