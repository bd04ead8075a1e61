//! Numeric-aware ("natural") file name ordering: `frame2.png` < `frame10.png`.

use std::cmp::Ordering;
use std::path::PathBuf;

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut a);
                let nb = take_digits(&mut b);
                let ord = cmp_digit_runs(&na, &nb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.cmp(&cb);
                if ord != Ordering::Equal {
                    return ord;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(it: &mut std::iter::Peekable<I>) -> String {
    let mut out = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        out.push(c);
        it.next();
    }
    out
}

// Digit runs of any length: compare by magnitude, then by leading zeros.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Sort paths by file name in natural order; full path breaks ties.
pub fn natural_sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let na = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let nb = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&na, &nb).then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_value() {
        let mut names = vec!["10.jpg", "2.jpg", "1.jpg", "frame_100.png", "frame_20.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["1.jpg", "2.jpg", "10.jpg", "frame_20.png", "frame_100.png"]
        );
    }

    #[test]
    fn leading_zeros_and_prefixes() {
        assert_eq!(natural_cmp("007", "7"), Ordering::Greater);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
        assert_eq!(natural_cmp("img9", "img09"), Ordering::Less);
        assert_eq!(natural_cmp("x1y2", "x1y10"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn sorts_paths_by_file_name() {
        let mut paths = vec![
            PathBuf::from("dir/11.png"),
            PathBuf::from("dir/3.png"),
            PathBuf::from("dir/0.png"),
        ];
        natural_sort_paths(&mut paths);
        let names: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(names, vec!["dir/0.png", "dir/3.png", "dir/11.png"]);
    }
}
