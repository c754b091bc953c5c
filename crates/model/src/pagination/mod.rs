mod cursor;

pub use cursor::CursorTuple;
