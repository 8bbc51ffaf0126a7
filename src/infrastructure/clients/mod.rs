pub(crate) mod wiki;

#[cfg(test)]
pub(crate) mod test_server;
