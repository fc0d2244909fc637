mod common;
mod counting;
mod groups;
