//! Combining cells.
//!
//! `zip2` and `zip3` are plain compositions of [`Cell::flat_map`] and
//! [`Cell::map`]. They get cutoff and height ordering from those building
//! blocks rather than special-casing anything.

use std::rc::Rc;

use super::cell::Cell;

/// Combine two cells with a pure function.
pub fn zip2<A, B, C, F>(a: &Cell<A>, b: &Cell<B>, combine: F) -> Cell<C>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + PartialEq + 'static,
    F: Fn(&A, &B) -> C + 'static,
{
    let combine = Rc::new(combine);
    let b = b.clone();
    a.flat_map(move |x| {
        let x = x.clone();
        let combine = Rc::clone(&combine);
        b.map(move |y| combine(&x, y))
    })
}

/// Combine three cells with a pure function.
pub fn zip3<A, B, C, D, F>(a: &Cell<A>, b: &Cell<B>, c: &Cell<C>, combine: F) -> Cell<D>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + PartialEq + 'static,
    F: Fn(&A, &B, &C) -> D + 'static,
{
    let combine = Rc::new(combine);
    let (b, c) = (b.clone(), c.clone());
    a.flat_map(move |x| {
        let x = x.clone();
        let combine = Rc::clone(&combine);
        zip2(&b, &c, move |y, z| combine(&x, y, z))
    })
}
