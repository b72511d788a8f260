mod archive_roundtrip;
mod common;
mod status_flow;
