/// Logs and discards errors where the caller has no way to recover.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, context: &str) -> Option<T> {
        self.inspect_err(|err| log::error!("{context}: {err}")).ok()
    }
}
