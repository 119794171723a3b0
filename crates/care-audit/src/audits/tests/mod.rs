mod alerts;
mod common;
mod lifecycle;
mod rollup;
