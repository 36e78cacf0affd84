pub(crate) use self::crlf::CrlfFinder;
pub(crate) use self::split_spaces::split_spaces;

mod crlf;
mod split_spaces;
