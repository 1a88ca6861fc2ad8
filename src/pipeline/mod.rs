pub mod extraction; // Text acquisition: PDF tier cascade + image OCR
pub mod parameters; // Regex parameter recognition, units, ranges
pub mod processor; // file → text → parameters
