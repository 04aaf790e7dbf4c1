pub mod collection;
pub mod heap;
pub mod index;
pub mod storage;
