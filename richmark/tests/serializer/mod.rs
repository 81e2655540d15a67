//! Serializer tests: built-in output, host overrides and error reporting

mod export;
