mod tests_formatter;
