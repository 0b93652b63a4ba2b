use super::*;

fn spec(size: f32) -> FontSpec {
    FontSpec {
        family: "Arial".to_owned(),
        size_px: size,
        weight: FontWeight::ExtraBold,
        italic: true,
    }
}

fn find_system_font() -> Option<std::path::PathBuf> {
    let roots = ["/usr/share/fonts", "/usr/local/share/fonts", "/Library/Fonts"];
    let mut stack: Vec<std::path::PathBuf> = roots.iter().map(std::path::PathBuf::from).collect();
    let mut found = Vec::new();
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for e in entries.flatten() {
            let p = e.path();
            if p.is_dir() {
                stack.push(p);
            } else if p.extension().is_some_and(|x| x.eq_ignore_ascii_case("ttf")) {
                found.push(p);
            }
        }
    }
    found.sort();
    let plain_sans = |p: &std::path::PathBuf| {
        let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        name.contains("Sans") && !name.contains("Mono") && !name.contains("Math")
    };
    found
        .iter()
        .find(|p| plain_sans(p))
        .or_else(|| found.first())
        .cloned()
}

#[test]
fn descriptor_matches_css_shorthand() {
    assert_eq!(spec(96.0).descriptor(), "italic 900 96px Arial");
    let plain = FontSpec {
        weight: FontWeight::Bold,
        italic: false,
        ..spec(40.0)
    };
    assert_eq!(plain.descriptor(), "normal bold 40px Arial");
}

#[test]
fn fixed_advance_counts_chars() {
    let mut s = FixedAdvanceShaper::default();
    assert_eq!(s.measure("abc ", &spec(10.0)).unwrap(), 20.0);
    let shaped = s.shape("héllo", &spec(10.0)).unwrap();
    assert_eq!(shaped.advance, 25.0);
    assert!(shaped.glyphs.is_empty());
    assert!(shaped.font.is_none());
}

#[test]
fn parley_shaper_requires_fonts() {
    assert!(ParleyShaper::new(&FontBook::new()).is_err());
}

#[test]
fn parley_shaper_measures_with_system_font() {
    let Some(path) = find_system_font() else {
        eprintln!("no system .ttf font found; skipping");
        return;
    };
    let mut book = FontBook::new();
    book.load("Arial", &path).unwrap();
    let mut shaper = ParleyShaper::new(&book).unwrap();

    let word = shaper.measure("Hello", &spec(48.0)).unwrap();
    let spaced = shaper.measure("Hello ", &spec(48.0)).unwrap();
    assert!(word > 0.0);
    assert!(spaced > word);

    let shaped = shaper.shape("Hello", &spec(48.0)).unwrap();
    assert_eq!(shaped.glyphs.len(), 5);
    assert!(shaped.font.is_some());
    assert!(shaped.glyphs.windows(2).all(|w| w[1].x > w[0].x));

    // Unknown families fall back to the first configured font.
    let other = FontSpec {
        family: "Nope".to_owned(),
        ..spec(48.0)
    };
    assert_eq!(shaper.measure("Hello", &other).unwrap(), word);
}
