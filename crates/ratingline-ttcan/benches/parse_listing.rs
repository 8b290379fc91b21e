//! Benchmarks for listing and detail page extraction

use std::fmt::Write;

use chrono::NaiveDate;
use ratingline_ttcan::age::extract_age;
use ratingline_ttcan::history::extract_history;
use ratingline_ttcan::parse_listing;

const BASE: &str = "http://www.ttcan.ca/ratingSystem/ctta_ratings2.asp";

fn listing_page(rows: usize) -> String {
    let mut html = String::from(
        r#"<html><body><table class="resultTable"><tr><th>#</th><th>Name</th><th>Prov</th><th>Sex</th><th>Rating</th><th>Period</th><th>Last</th></tr>"#,
    );
    for i in 0..rows {
        let _ = write!(
            html,
            r#"<tr><td>{i}</td><td><a href="ctta_player.asp?ID={i}">PLAYER, No{i}</a></td><td>ON</td><td>F</td><td>{}</td><td>July 6, 2025</td><td>2025-06-14</td></tr>"#,
            1000 + i
        );
    }
    html.push_str("</table></body></html>");
    html
}

fn detail_page(rows: usize) -> String {
    let mut html = String::from("<html><body><p>Born: 1990</p><table>");
    for i in 0..rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>March 4, {}</td><td>ON</td><td>F</td><td>{}</td></tr>",
            100 + i,
            2000 + i % 25,
            900 + i
        );
    }
    html.push_str("</table></body></html>");
    html
}

#[divan::bench(args = [20, 100])]
fn listing(bencher: divan::Bencher, rows: usize) {
    let html = listing_page(rows);
    bencher.bench(|| parse_listing(divan::black_box(&html), BASE, 3500));
}

#[divan::bench]
fn detail(bencher: divan::Bencher) {
    let html = detail_page(200);
    let today = NaiveDate::from_ymd_opt(2025, 7, 6).unwrap();
    bencher.bench(|| {
        let age = extract_age(divan::black_box(&html), today);
        let history = extract_history(divan::black_box(&html), 2010, 3500);
        (age, history.len())
    });
}

fn main() {
    divan::main();
}
