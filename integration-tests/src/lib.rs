//! Tests against a deployed stream live in `tests/`; they are ignored by default.
