//! A todo list driven through projections: one source of truth, two live read-only views that
//! stay synchronized as todos are added, completed, and removed.
use miravec::prelude::*;

use std::rc::Rc;

struct Todo {
    title: String,
    done: Var<bool>,
}

impl Todo {
    fn new(title: &str) -> Rc<Self> {
        Rc::new(Self {
            title: title.to_string(),
            done: Var::new(false),
        })
    }
}

impl Tracked for Todo {
    fn watch(&self, watcher: Box<dyn FnMut()>) -> Subscription {
        self.done.watch(watcher)
    }
}

fn main() {
    let todos = ObservableList::<Rc<Todo>>::new();
    todos.track_item_changes();

    // Open todos, in insertion order.
    let remaining = todos
        .derive()
        .filter(|todo: &Rc<Todo>| !todo.done.get())
        .build();

    // Every title, alphabetized.
    let titles = todos
        .derive()
        .select(|todo: &Rc<Todo>| Rc::new(todo.title.clone()))
        .order_by(|a: &Rc<String>, b| a.cmp(b))
        .build();

    let _log = remaining.on_change(Box::new(|event: &ListEvent<Rc<Todo>>| match event {
        ListEvent::Added { from, items } => println!("  + {:?} (at {from})", items[0].title),
        ListEvent::Removed { from, items } => println!("  - {:?} (from {from})", items[0].title),
        ListEvent::Moved { from, to, .. } => println!("  ~ moved {from} -> {to}"),
        ListEvent::Replaced { from, items } => println!("  * {:?} (at {from})", items[0].title),
        ListEvent::Reset => println!("  ! reset"),
    }));

    println!("adding todos");
    todos.push(Todo::new("walk the dog"));
    todos.push(Todo::new("buy groceries"));
    let chores = Todo::new("do the dishes");
    todos.push(chores.clone());

    println!("completing {:?}", chores.title);
    chores.done.set(true); // remaining reconciles via the element's own change stream

    println!("removing the first todo");
    todos.remove_at(0);

    let snapshot = remaining.snapshot();
    let open: Vec<&str> = snapshot.iter().map(|todo| todo.title.as_str()).collect();
    println!("remaining: {open:?}");
    println!("titles a-z: {:?}", titles.snapshot());
    assert!(remaining.push(Todo::new("sneaky")).is_err(), "projections are read-only");
}
