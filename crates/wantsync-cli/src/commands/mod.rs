pub mod wanted;
