//! Balanced-parenthesis block extraction.

/// Find the call that opens at or after `start` and return `(start, end)`.
///
/// Scans forward counting `(` and `)` per line. The block ends on the first
/// line where both counts are equal after at least one `(` was seen. A
/// closing parenthesis before any opening one, or input that runs out
/// before the counts balance, yields `None`.
pub fn extract_block<S: AsRef<str>>(lines: &[S], start: usize) -> Option<(usize, usize)> {
    let (mut open, mut close) = (0usize, 0usize);

    for (i, line) in lines.iter().enumerate().skip(start) {
        let line = line.as_ref();
        open += line.matches('(').count();
        close += line.matches(')').count();

        if open == 0 && close > 0 {
            return None;
        }
        if open > 0 && open == close {
            return Some((start, i));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_call() {
        let lines = ["print('Hello World')"];
        assert_eq!(extract_block(&lines, 0), Some((0, 0)));
    }

    #[test]
    fn test_multiline_call() {
        let lines = ["f(", "  a,", "  b)"];
        assert_eq!(extract_block(&lines, 0), Some((0, 2)));
    }

    #[test]
    fn test_nested_calls() {
        let lines = [
            "MyClass(",
            "    first_kwarg=nested(func())",
            "    second_kwarg=OtherClass(",
            "        first_kwarg='asdfg'",
            "        second_kwarg=12345",
            "    )",
            ")",
        ];
        assert_eq!(extract_block(&lines, 0), Some((0, 6)));
    }

    #[test]
    fn test_starts_mid_file() {
        let lines = ["let x = 1;", "call(", "  y,", ");", "other()"];
        assert_eq!(extract_block(&lines, 1), Some((1, 3)));
    }

    #[test]
    fn test_truncated_call() {
        let lines = ["f(", "  a,"];
        assert_eq!(extract_block(&lines, 0), None);
    }

    #[test]
    fn test_close_before_open() {
        let lines = ["SomeFunction", "   arg1, arg2)"];
        assert_eq!(extract_block(&lines, 0), None);
    }

    #[test]
    fn test_start_out_of_range() {
        let lines = ["f()"];
        assert_eq!(extract_block(&lines, 5), None);
        let empty: [&str; 0] = [];
        assert_eq!(extract_block(&empty, 0), None);
    }

    #[test]
    fn test_no_parentheses() {
        let lines = ["# comment", "plain text"];
        assert_eq!(extract_block(&lines, 0), None);
    }
}
