pub mod computer_use;
