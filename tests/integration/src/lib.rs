//! Integration tests for the finvo workspace live in `tests/`.
