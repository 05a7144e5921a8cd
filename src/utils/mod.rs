pub mod dump_files;
