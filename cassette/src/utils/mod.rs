pub(crate) mod parse;

#[cfg(test)]
pub(crate) mod test_utils;
