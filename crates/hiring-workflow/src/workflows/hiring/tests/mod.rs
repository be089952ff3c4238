mod applications;
mod common;
