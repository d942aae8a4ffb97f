mod columns;
mod common;
mod messaging;
mod selection;
