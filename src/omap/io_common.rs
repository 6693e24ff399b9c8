use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(
            simplify_file_name("/data/Resultado Geral.csv"),
            "Resultado Geral.csv"
        );
        assert_eq!(simplify_file_name("survey.xlsx"), "survey.xlsx");
    }
}
