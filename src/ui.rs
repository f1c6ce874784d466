use crate::calculator::{Calculator, Key};
use crate::config::Config;
use crate::converter::{convert, parse_amount, swap};
use crate::currency::Currency;
use crate::i18n::Locale;
use crate::rates::{Endpoints, HttpRateSource, RateProvider};
use crate::refresher::{FetchEvent, RateStore, Refresher, StoreUpdate};
use gtk::prelude::*;
use gtk::gdk;
use gtk::{
    Application, ApplicationWindow, Box as GtkBox, Button, DropDown, Entry, EventControllerKey,
    Grid, Label, Notebook, Orientation,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Empty cells are skipped; "0" spans two columns.
const KEYPAD: [[&str; 4]; 5] = [
    ["C", "⌫", "", "/"],
    ["7", "8", "9", "*"],
    ["4", "5", "6", "-"],
    ["1", "2", "3", "+"],
    ["0", "", ".", "="],
];

const CSS: &str = r#"
    entry.calc-display {
        font-size: 20pt;
        padding: 8px;
    }

    button.calc-key {
        font-size: 14pt;
        min-height: 40px;
    }

    label.fx-result {
        font-weight: bold;
    }

    label.fx-meta {
        opacity: 0.7;
        font-size: 9pt;
    }
"#;

struct CalcTab {
    container: GtkBox,
    // "=" key; takes keyboard focus whenever the tab is shown
    focus: Option<Button>,
}

struct FxTab {
    container: GtkBox,
    amount: Entry,
    from: DropDown,
    to: DropDown,
    result: Label,
    as_of: Label,
    status: Label,
    refresh: Button,
    convert: Button,
}

pub fn build_ui(app: &Application, config: Config) {
    let locale = config.ui.locale;

    let window = ApplicationWindow::builder()
        .application(app)
        .title(locale.window_title())
        .default_width(config.ui.width)
        .default_height(config.ui.height)
        .build();

    load_css();

    let calculator = Rc::new(RefCell::new(Calculator::new()));
    let store = Rc::new(RefCell::new(RateStore::new(
        config.rates.discard_stale_results,
    )));

    let notebook = Notebook::new();
    let calc = build_calc_tab(&calculator);
    let calc_page = notebook.append_page(
        &calc.container,
        Some(&Label::new(Some(locale.calculator_tab()))),
    );

    let fx = Rc::new(build_fx_tab(locale));
    notebook.append_page(&fx.container, Some(&Label::new(Some(locale.converter_tab()))));

    {
        let snapshot = store.borrow();
        fx.as_of.set_text(&locale.as_of(snapshot.current()));
        fx.status.set_text(locale.status_for(snapshot.current()));
    }

    let fx_clone = fx.clone();
    let store_clone = store.clone();
    fx.convert.connect_clicked(move |_| {
        on_convert(&fx_clone, &store_clone.borrow(), locale);
    });

    let fx_clone = fx.clone();
    let store_clone = store.clone();
    fx.amount.connect_activate(move |_| {
        on_convert(&fx_clone, &store_clone.borrow(), locale);
    });

    match HttpRateSource::new(config.rates.timeout()) {
        Ok(source) => {
            let provider = RateProvider::new(source, Endpoints::from_config(&config.rates));
            let (refresher, receiver) = Refresher::new(provider);
            watch_fetch_events(receiver, store.clone(), fx.clone(), locale);

            let start_fetch = {
                let store = store.clone();
                move || {
                    let seq = store.borrow_mut().next_request();
                    refresher.spawn(seq);
                }
            };
            let start_fetch = Rc::new(start_fetch);

            let start_clone = start_fetch.clone();
            fx.refresh.connect_clicked(move |_| start_clone());

            if config.ui.fetch_on_startup {
                start_fetch();
            }
        }
        Err(e) => {
            log::error!("HTTP client unavailable, staying on offline rates: {}", e);
            fx.refresh.set_sensitive(false);
            fx.status.set_text(&locale.status_failed(&e.to_string()));
        }
    }

    let focus = calc.focus.clone();
    notebook.connect_switch_page(move |_, _, page| {
        if page == calc_page {
            // the page is not mapped yet while the signal runs
            if let Some(focus) = focus.clone() {
                glib::idle_add_local_once(move || {
                    focus.grab_focus();
                });
            }
        }
    });

    window.set_child(Some(&notebook));
    window.present();
    if let Some(focus) = &calc.focus {
        focus.grab_focus();
    }
}

fn load_css() {
    let provider = gtk::CssProvider::new();
    provider.load_from_data(CSS);
    match gdk::Display::default() {
        Some(display) => gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => log::warn!("no default display, skipping stylesheet"),
    }
}

fn build_calc_tab(calculator: &Rc<RefCell<Calculator>>) -> CalcTab {
    let calc_box = GtkBox::builder()
        .orientation(Orientation::Vertical)
        .spacing(5)
        .margin_top(10)
        .margin_bottom(10)
        .margin_start(10)
        .margin_end(10)
        .build();

    let display = Entry::new();
    display.set_text(&calculator.borrow().display());
    display.set_editable(false);
    display.set_can_focus(false);
    gtk::prelude::EntryExt::set_alignment(&display, 1.0);
    display.add_css_class("calc-display");
    calc_box.append(&display);

    let grid = Grid::builder()
        .row_spacing(5)
        .column_spacing(5)
        .row_homogeneous(true)
        .column_homogeneous(true)
        .vexpand(true)
        .build();
    calc_box.append(&grid);

    let mut focus = None;
    for (r, row) in KEYPAD.iter().enumerate() {
        for (c, &label) in row.iter().enumerate() {
            let Some(key) = Key::from_label(label) else {
                continue;
            };

            let button = Button::with_label(label);
            button.add_css_class("calc-key");
            let calculator = calculator.clone();
            let display = display.clone();
            button.connect_clicked(move |_| {
                log::debug!("button pressed: {}", label);
                press_key(&calculator, &display, key);
            });

            if key == Key::Equals {
                focus = Some(button.clone());
            }

            let width = if label == "0" { 2 } else { 1 };
            grid.attach(&button, c as i32, r as i32, width, 1);
        }
    }

    // Typed keys go through the same state machine as the buttons. Capture phase so a
    // focused keypad button never sees Return/space as its own activation.
    let key_controller = EventControllerKey::new();
    key_controller.set_propagation_phase(gtk::PropagationPhase::Capture);
    let calculator = calculator.clone();
    key_controller.connect_key_pressed(move |_, keyval, _, _| {
        let name = keyval.name();
        match Key::from_keypress(name.as_deref().unwrap_or_default(), keyval.to_unicode()) {
            Some(key) => {
                log::debug!("key pressed: {:?}", key);
                press_key(&calculator, &display, key);
                glib::Propagation::Stop
            }
            None => glib::Propagation::Proceed,
        }
    });
    calc_box.add_controller(key_controller);

    CalcTab {
        container: calc_box,
        focus,
    }
}

fn press_key(calculator: &Rc<RefCell<Calculator>>, display: &Entry, key: Key) {
    let text = {
        let mut calc = calculator.borrow_mut();
        calc.press(key);
        calc.display()
    };
    log::debug!("display: {}", text);
    display.set_text(&text);
}

fn build_fx_tab(locale: Locale) -> FxTab {
    let container = GtkBox::builder()
        .orientation(Orientation::Vertical)
        .spacing(10)
        .margin_top(10)
        .margin_bottom(10)
        .margin_start(10)
        .margin_end(10)
        .build();

    let amount_row = GtkBox::new(Orientation::Horizontal, 5);
    let amount = Entry::new();
    amount.set_text("100");
    amount.set_hexpand(true);
    amount_row.append(&Label::new(Some(locale.amount_label())));
    amount_row.append(&amount);
    container.append(&amount_row);

    let codes: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
    let from = DropDown::from_strings(&codes);
    from.set_selected(Currency::Usd.index() as u32);
    let to = DropDown::from_strings(&codes);
    to.set_selected(Currency::Eur.index() as u32);

    let swap_button = Button::with_label("⇄");
    let from_clone = from.clone();
    let to_clone = to.clone();
    swap_button.connect_clicked(move |_| {
        let (Some(from), Some(to)) = (selected_currency(&from_clone), selected_currency(&to_clone))
        else {
            return;
        };
        let (from, to) = swap(from, to);
        from_clone.set_selected(from.index() as u32);
        to_clone.set_selected(to.index() as u32);
    });

    let currency_row = GtkBox::new(Orientation::Horizontal, 5);
    currency_row.append(&Label::new(Some(locale.from_label())));
    currency_row.append(&from);
    currency_row.append(&swap_button);
    currency_row.append(&Label::new(Some(locale.to_label())));
    currency_row.append(&to);
    container.append(&currency_row);

    let convert = Button::with_label(locale.convert_button());
    container.append(&convert);

    let result = Label::new(Some(locale.result_placeholder()));
    result.set_halign(gtk::Align::Start);
    result.add_css_class("fx-result");
    container.append(&result);

    let as_of = Label::new(None);
    as_of.set_halign(gtk::Align::Start);
    as_of.add_css_class("fx-meta");
    container.append(&as_of);

    let status_row = GtkBox::new(Orientation::Horizontal, 5);
    let status = Label::new(None);
    status.set_hexpand(true);
    status.set_halign(gtk::Align::Start);
    status.set_wrap(true);
    status.add_css_class("fx-meta");
    let refresh = Button::with_label(locale.refresh_button());
    status_row.append(&status);
    status_row.append(&refresh);
    container.append(&status_row);

    FxTab {
        container,
        amount,
        from,
        to,
        result,
        as_of,
        status,
        refresh,
        convert,
    }
}

fn selected_currency(dropdown: &DropDown) -> Option<Currency> {
    Currency::from_index(dropdown.selected() as usize)
}

fn on_convert(fx: &FxTab, store: &RateStore, locale: Locale) {
    let amount = match parse_amount(&fx.amount.text()) {
        Ok(amount) => amount,
        Err(e) => {
            log::debug!("rejected amount: {}", e);
            fx.result.set_text(&locale.amount_error(&e));
            return;
        }
    };

    let (Some(from), Some(to)) = (selected_currency(&fx.from), selected_currency(&fx.to)) else {
        fx.result.set_text(locale.currency_error());
        return;
    };

    let value = convert(amount, from, to, store.current());
    log::debug!("converted {} {} -> {} {}", amount, from, value, to);
    fx.result.set_text(&locale.result(value, to));
}

/// Applies worker results on the UI thread.
fn watch_fetch_events(
    receiver: Receiver<FetchEvent>,
    store: Rc<RefCell<RateStore>>,
    fx: Rc<FxTab>,
    locale: Locale,
) {
    glib::timeout_add_local(EVENT_POLL_INTERVAL, move || {
        for event in receiver.try_iter() {
            let update = store.borrow_mut().handle(event);
            match update {
                StoreUpdate::FetchStarted => fx.status.set_text(locale.status_updating()),
                StoreUpdate::Updated => {
                    fx.as_of.set_text(&locale.as_of(store.borrow().current()));
                    fx.status.set_text(locale.status_updated());
                }
                StoreUpdate::Failed(reason) => fx.status.set_text(&locale.status_failed(&reason)),
                StoreUpdate::Stale => {}
            }
        }
        glib::ControlFlow::Continue
    });
}
