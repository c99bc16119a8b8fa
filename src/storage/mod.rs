pub mod keychain;
pub mod note;
pub mod settings_io;
