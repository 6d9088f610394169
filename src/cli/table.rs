use terminal_size::{terminal_size, Width};

use crate::model::Product;

// Render a product page as an ASCII table. Column widths grow to fit the
// data, capped so the table stays readable on narrow terminals.
pub fn print_product_table(products: &[Product]) {
    if products.is_empty() {
        println!("(no products)");
        return;
    }

    let cols = ["id", "name", "category", "kcal", "protein", "carbs", "fat", "owner"];
    let rows: Vec<Vec<String>> = products
        .iter()
        .map(|p| {
            vec![
                p.product_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                p.name.clone(),
                p.product_category.to_string(),
                fmt_num(p.calories),
                fmt_num(p.protein),
                fmt_num(p.carbs),
                fmt_num(p.fat),
                p.owner_username.clone().unwrap_or_else(|| "(global)".into()),
            ]
        })
        .collect();

    let max_col_width = max_col_width();
    let mut widths: Vec<usize> = cols.iter().map(|c| c.len()).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate() {
            let w = cell.chars().count().min(max_col_width);
            if w > widths[i] {
                widths[i] = w;
            }
        }
    }

    let sep = build_separator(&widths);
    println!("{}", sep);
    println!("{}", build_row(&cols.map(String::from), &widths, max_col_width));
    println!("{}", sep);
    for r in &rows {
        println!("{}", build_row(r, &widths, max_col_width));
    }
    println!("{}", sep);
    println!("rows: {}", rows.len());
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{:.1}", n)
    }
}

fn max_col_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if (w as usize) > 40 => (w as usize) / 3,
        _ => 40,
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(w + 2));
        s.push('+');
    }
    s
}

fn build_row<S: AsRef<str>>(cells: &[S], widths: &[usize], max_col_width: usize) -> String {
    let mut s = String::from("|");
    for (i, cell) in cells.iter().enumerate() {
        let mut text: String = cell.as_ref().to_string();
        if text.chars().count() > max_col_width {
            text = text.chars().take(max_col_width.saturating_sub(1)).collect();
            text.push('…');
        }
        let pad = widths[i].saturating_sub(text.chars().count());
        s.push(' ');
        s.push_str(&text);
        s.push_str(&" ".repeat(pad + 1));
        s.push('|');
    }
    s
}
