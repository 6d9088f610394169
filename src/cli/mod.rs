//! Interactive interpreter over the product API. Commands map one-to-one to
//! the gateway operations; edit/delete affordances are gated client-side by
//! the ownership predicates before any request is sent.

mod table;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::debug;

use crate::api::ProductApi;
use crate::authz::{can_modify, has_role};
use crate::config::{PRODUCTS_PER_PAGE, ROLE_ADMIN, ROLE_USER};
use crate::error::ClientError;
use crate::model::{Product, ProductCategory, ProductFilters};
use crate::validation::{into_new_product, ProductForm};

pub use table::print_product_table;

fn print_help() {
    println!(
        "Commands:\n  \
         login <username> <password>   authenticate against the identity provider\n  \
         logout                        end the session\n  \
         whoami | status               show the current session\n  \
         list [page] [category=<c>] [name=<s>]   list products (page is 0-based)\n  \
         next | prev                   page through the current listing\n  \
         show <id>                     show one product\n  \
         add [custom]                  add a product (global for ADMIN unless 'custom')\n  \
         edit <id>                     edit a product you may modify\n  \
         delete <id>                   delete a product you may modify\n  \
         categories                    list known product categories\n  \
         help                          show this help\n  \
         quit | exit                   leave"
    );
}

fn prompt(label: &str, default: Option<&str>) -> String {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return default.unwrap_or("").to_string();
    }
    let line = line.trim();
    if line.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        line.to_string()
    }
}

fn read_product_form(existing: Option<&Product>) -> ProductForm {
    let fmt = |n: f64| n.to_string();
    ProductForm {
        name: prompt("name", existing.map(|p| p.name.as_str())),
        category: prompt(
            "category",
            existing.map(|p| p.product_category.as_str()),
        ),
        calories: prompt("calories", existing.map(|p| fmt(p.calories)).as_deref()),
        protein: prompt("protein", existing.map(|p| fmt(p.protein)).as_deref()),
        carbs: prompt("carbs", existing.map(|p| fmt(p.carbs)).as_deref()),
        fat: prompt("fat", existing.map(|p| fmt(p.fat)).as_deref()),
    }
}

fn report(err: &ClientError) {
    if err.is_forbidden() {
        // The backend denied the action; notify and fall back to the prompt.
        println!("forbidden: {}", err.message());
    } else {
        eprintln!("error: {}", err.message());
    }
}

async fn run_list(api: &ProductApi, filters: &ProductFilters) -> Vec<Product> {
    match api.list(filters).await {
        Ok(products) => {
            print_product_table(&products);
            let has_more = products.len() == PRODUCTS_PER_PAGE;
            println!(
                "Page {}{}",
                filters.page_no + 1,
                if has_more { " (more available: 'next')" } else { "" }
            );
            products
        }
        Err(e) => {
            report(&e);
            Vec::new()
        }
    }
}

/// Find a product on the current page, or fetch it by id.
async fn resolve_product(api: &ProductApi, page: &[Product], id: i64) -> Option<Product> {
    if let Some(p) = page.iter().find(|p| p.product_id == Some(id)) {
        return Some(p.clone());
    }
    match api.get(id).await {
        Ok(p) => Some(p),
        Err(e) => {
            report(&e);
            None
        }
    }
}

pub async fn run_repl(api: ProductApi) -> Result<()> {
    let session_mgr = api.client().session().clone();
    let mut filters = ProductFilters::default();
    let mut current_page: Vec<Product> = Vec::new();

    {
        let s = session_mgr.snapshot();
        if let Some(u) = &s.user {
            println!("Logged in as {} (roles: {})", u.username, roles_line(&u.roles));
        } else {
            println!("Not logged in. Use: login <username> <password>");
        }
    }
    println!("mealtrack interpreter. Type 'help' for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    loop {
        input.clear();
        print!("> ");
        let _ = stdout.flush();
        if stdin.lock().read_line(&mut input).is_err() {
            break;
        }
        if input.is_empty() {
            // EOF
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        let up = line.to_uppercase();
        if up == "EXIT" || up == "QUIT" {
            break;
        }
        if up == "HELP" {
            print_help();
            continue;
        }
        if up == "CATEGORIES" {
            for c in ProductCategory::ALL {
                println!("  {}", c);
            }
            continue;
        }
        if up == "WHOAMI" || up == "STATUS" {
            let s = session_mgr.snapshot();
            match &s.user {
                Some(u) => {
                    println!("user: {}", u.username);
                    if let Some(e) = &u.email {
                        println!("email: {}", e);
                    }
                    println!("roles: {}", roles_line(&u.roles));
                }
                None => println!("not logged in"),
            }
            continue;
        }
        if let Some(rest) = strip_cmd(line, "login") {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.len() != 2 {
                eprintln!("usage: login <username> <password>");
                continue;
            }
            match session_mgr.login(parts[0], parts[1]).await {
                Ok(()) => {
                    let s = session_mgr.snapshot();
                    let name = s.user.as_ref().map(|u| u.username.as_str()).unwrap_or("?");
                    println!("logged in as {}", name);
                }
                Err(e) => eprintln!("login failed: {}", e),
            }
            continue;
        }
        if up == "LOGOUT" {
            session_mgr.logout().await;
            println!("logged out");
            continue;
        }
        if up == "LIST" || up.starts_with("LIST ") {
            match parse_list_args(line) {
                Ok(parsed) => {
                    filters = parsed;
                    current_page = run_list(&api, &filters).await;
                }
                Err(msg) => eprintln!("{}", msg),
            }
            continue;
        }
        if up == "NEXT" {
            if current_page.len() < PRODUCTS_PER_PAGE {
                println!("no more pages");
                continue;
            }
            filters.page_no += 1;
            current_page = run_list(&api, &filters).await;
            continue;
        }
        if up == "PREV" {
            filters.page_no = filters.page_no.saturating_sub(1);
            current_page = run_list(&api, &filters).await;
            continue;
        }
        if let Some(rest) = strip_cmd(line, "show") {
            let Ok(id) = rest.trim().parse::<i64>() else {
                eprintln!("usage: show <id>");
                continue;
            };
            match api.get(id).await {
                Ok(p) => print_product_table(std::slice::from_ref(&p)),
                Err(e) => report(&e),
            }
            continue;
        }
        if up == "ADD" || up == "ADD CUSTOM" {
            let session = session_mgr.snapshot();
            if !(has_role(ROLE_ADMIN, &session) || has_role(ROLE_USER, &session)) {
                println!("log in to add products");
                continue;
            }
            let as_global = has_role(ROLE_ADMIN, &session) && up != "ADD CUSTOM";
            let form = read_product_form(None);
            match into_new_product(&form) {
                Ok(new_product) => {
                    debug!(target: "mealtrack::cli", "adding product kind={}", if as_global { "global" } else { "custom" });
                    let result = if as_global {
                        api.add_global(&new_product).await
                    } else {
                        api.add_custom(&new_product).await
                    };
                    match result {
                        Ok(p) => {
                            println!("added:");
                            print_product_table(std::slice::from_ref(&p));
                        }
                        Err(e) => report(&e),
                    }
                }
                Err(errors) => print_field_errors(&errors),
            }
            continue;
        }
        if let Some(rest) = strip_cmd(line, "edit") {
            let Ok(id) = rest.trim().parse::<i64>() else {
                eprintln!("usage: edit <id>");
                continue;
            };
            let Some(product) = resolve_product(&api, &current_page, id).await else {
                continue;
            };
            let session = session_mgr.snapshot();
            if !can_modify(&product, &session) {
                println!("you do not have permission to edit this product");
                continue;
            }
            let form = read_product_form(Some(&product));
            match into_new_product(&form) {
                Ok(updated) => match api.update(id, &updated).await {
                    Ok(p) => {
                        println!("updated:");
                        print_product_table(std::slice::from_ref(&p));
                    }
                    Err(e) => report(&e),
                },
                Err(errors) => print_field_errors(&errors),
            }
            continue;
        }
        if let Some(rest) = strip_cmd(line, "delete") {
            let Ok(id) = rest.trim().parse::<i64>() else {
                eprintln!("usage: delete <id>");
                continue;
            };
            let Some(product) = resolve_product(&api, &current_page, id).await else {
                continue;
            };
            let session = session_mgr.snapshot();
            if !can_modify(&product, &session) {
                println!("you do not have permission to delete this product");
                continue;
            }
            let confirm = prompt(&format!("delete '{}'? (y/N)", product.name), Some("n"));
            if !confirm.eq_ignore_ascii_case("y") {
                println!("cancelled");
                continue;
            }
            match api.delete(id).await {
                Ok(()) => println!("deleted"),
                Err(e) => report(&e),
            }
            continue;
        }
        eprintln!("unrecognized command: {} (try 'help')", line);
    }
    Ok(())
}

fn roles_line(roles: &std::collections::HashSet<String>) -> String {
    let mut v: Vec<&str> = roles.iter().map(|s| s.as_str()).collect();
    v.sort_unstable();
    if v.is_empty() {
        "(none)".to_string()
    } else {
        v.join(", ")
    }
}

fn strip_cmd<'a>(line: &'a str, cmd: &str) -> Option<&'a str> {
    if line.len() < cmd.len() || !line.is_char_boundary(cmd.len()) {
        return None;
    }
    let (head, rest) = line.split_at(cmd.len());
    if !head.eq_ignore_ascii_case(cmd) {
        return None;
    }
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn print_field_errors(errors: &std::collections::BTreeMap<&'static str, String>) {
    for (field, msg) in errors {
        eprintln!("  {}: {}", field, msg);
    }
}

fn parse_list_args(line: &str) -> Result<ProductFilters, String> {
    let mut filters = ProductFilters::default();
    for arg in line.split_whitespace().skip(1) {
        if let Some(cat) = arg.strip_prefix("category=") {
            filters.category =
                Some(cat.parse::<ProductCategory>().map_err(|e| e.to_string())?);
        } else if let Some(name) = arg.strip_prefix("name=") {
            filters.name = Some(name.to_string());
        } else if let Ok(page) = arg.parse::<u32>() {
            filters.page_no = page;
        } else {
            return Err(format!(
                "unrecognized argument: {} (usage: list [page] [category=<c>] [name=<s>])",
                arg
            ));
        }
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_args_parse_page_category_and_name() {
        let f = parse_list_args("list 2 category=dairy name=milk").unwrap();
        assert_eq!(f.page_no, 2);
        assert_eq!(f.category, Some(ProductCategory::Dairy));
        assert_eq!(f.name.as_deref(), Some("milk"));
    }

    #[test]
    fn list_args_reject_unknown_tokens() {
        assert!(parse_list_args("list banana").is_err());
        assert!(parse_list_args("list category=bread").is_err());
    }

    #[test]
    fn strip_cmd_requires_word_boundary() {
        assert_eq!(strip_cmd("show 5", "show"), Some("5"));
        assert_eq!(strip_cmd("showcase", "show"), None);
        assert_eq!(strip_cmd("SHOW 5", "show"), Some("5"));
    }

    #[test]
    fn strip_cmd_matches_any_case() {
        assert_eq!(strip_cmd("Edit 5", "edit"), Some("5"));
        assert_eq!(strip_cmd("DeLeTe 7", "delete"), Some("7"));
        assert_eq!(strip_cmd("édit 5", "edit"), None);
    }
}
