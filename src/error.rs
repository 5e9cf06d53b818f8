use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load settings")]
    Settings,
    #[display("could not set up {_0}")]
    Setup(#[error(not(source))] &'static str),
    #[display("command failed")]
    Command,
}
